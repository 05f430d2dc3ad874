use console_api::{CancelHandle, ConsoleApiClient, ExecuteRequest, RunCodeRequest};

use crate::backend::{ChatBackend, StreamFuture};

impl ChatBackend for ConsoleApiClient {
    fn execute_code<'a>(
        &'a self,
        request: RunCodeRequest,
        cancel: &'a CancelHandle,
    ) -> StreamFuture<'a> {
        Box::pin(async move { self.run_code(&request, Some(cancel)).await })
    }

    fn generate<'a>(
        &'a self,
        request: ExecuteRequest,
        cancel: &'a CancelHandle,
    ) -> StreamFuture<'a> {
        Box::pin(async move { self.execute(&request, Some(cancel)).await })
    }
}
