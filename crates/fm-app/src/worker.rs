//! Background layers computation.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fm_data::Dataset;
use fm_layers::{FlowMapColors, LayersData, LayersOptions, LayersResult, prepare_layers_data_with};

use crate::error::{AppError, AppResult};

/// One layers computation. `generation` identifies the input state it was
/// taken from.
#[derive(Debug, Clone)]
pub struct LayersRequest {
    pub generation: u64,
    pub dataset: Arc<Dataset>,
    pub colors: Arc<FlowMapColors>,
    pub options: LayersOptions,
}

#[derive(Debug)]
pub struct LayersResponse {
    pub generation: u64,
    pub result: LayersResult<Arc<LayersData>>,
}

/// Owns a thread that turns requests into layers data.
///
/// Requests queued while a computation runs are coalesced: only the newest
/// one is computed. Dropping the worker closes the inbox and joins the thread.
pub struct LayersWorker {
    request_tx: Option<Sender<LayersRequest>>,
    response_rx: Receiver<LayersResponse>,
    handle: Option<JoinHandle<()>>,
}

impl LayersWorker {
    pub fn spawn() -> AppResult<Self> {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();

        let handle = thread::Builder::new()
            .name("fm-layers".to_string())
            .spawn(move || Self::run(&request_rx, &response_tx))?;

        Ok(Self {
            request_tx: Some(request_tx),
            response_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, request: LayersRequest) -> AppResult<()> {
        let tx = self.request_tx.as_ref().ok_or_else(|| AppError::Worker {
            message: "worker is shut down".to_string(),
        })?;
        tx.send(request).map_err(|_| AppError::Worker {
            message: "worker thread has exited".to_string(),
        })
    }

    /// Next finished response, if any.
    pub fn try_recv(&self) -> AppResult<Option<LayersResponse>> {
        match self.response_rx.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AppError::Worker {
                message: "worker thread has exited".to_string(),
            }),
        }
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> AppResult<Option<LayersResponse>> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(AppError::Worker {
                message: "worker thread has exited".to_string(),
            }),
        }
    }

    fn run(requests: &Receiver<LayersRequest>, responses: &Sender<LayersResponse>) {
        while let Ok(mut request) = requests.recv() {
            let mut skipped = 0usize;
            while let Ok(newer) = requests.try_recv() {
                request = newer;
                skipped += 1;
            }
            if skipped > 0 {
                tracing::debug!(skipped, generation = request.generation, "coalesced layers requests");
            }

            let result = prepare_layers_data_with(
                request.dataset.locations(),
                request.dataset.flows(),
                &request.colors,
                &request.options,
            )
            .map(Arc::new);
            if let Err(e) = &result {
                tracing::warn!(generation = request.generation, error = %e, "layers computation failed");
            }

            let response = LayersResponse {
                generation: request.generation,
                result,
            };
            if responses.send(response).is_err() {
                break;
            }
        }
        tracing::debug!("layers worker stopped");
    }
}

impl Drop for LayersWorker {
    fn drop(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("layers worker panicked");
            }
        }
    }
}
