// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::reconciliation::{MissingDataRequest, MissingDataResult};
use async_trait::async_trait;

/// The external fetch of historical samples, typically a REST call.
///
/// Failures are returned as they are. The stream never retries a fetch.
#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch(&self, request: &MissingDataRequest) -> Result<MissingDataResult, Self::Error>;
}
