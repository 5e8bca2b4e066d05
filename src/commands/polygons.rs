use crate::{model::PolygonPool, transport::TransportError};

use super::Dispatcher;

impl Dispatcher {
    /// Pools detected inside one polygon. Read-only; `None` when offline.
    pub async fn polygon_pools(
        &self,
        polygon_id: u64,
    ) -> Option<Result<Vec<PolygonPool>, TransportError>> {
        let base = self.store.server_base()?;
        Some(self.transport.polygon_pools(&base, polygon_id).await)
    }
}
