use async_trait::async_trait;
use pacstrack_model::{TransferRequest, TransferResponse};
use std::sync::Arc;
use tracing::info;

use crate::api::ApiService;
use crate::error::ApiResult;
use crate::notify::Notifier;
use crate::submit::JobTarget;

/// Queues transfers of selected rows. Repopulates no view.
#[derive(Debug)]
pub(crate) struct TransferJob {
    api: Arc<dyn ApiService>,
    notifier: Notifier,
}

impl TransferJob {
    pub(crate) fn new(api: Arc<dyn ApiService>, notifier: Notifier) -> Self {
        Self { api, notifier }
    }
}

#[async_trait]
impl JobTarget for TransferJob {
    type Params = TransferRequest;
    type Response = TransferResponse;
    type Outcome = TransferResponse;

    async fn issue(&self, request: &TransferRequest) -> ApiResult<TransferResponse> {
        self.api.transfer(request).await
    }

    async fn complete(
        &self,
        request: TransferRequest,
        response: TransferResponse,
    ) -> TransferResponse {
        info!(
            destination = %request.destination,
            items = request.items.len(),
            "transfer queued"
        );
        self.notifier.info("Transfer queued", response.message.clone());
        response
    }
}
