// db/db.rs
use sqlx::{Pool, Postgres};

use super::{
    jobdb::JobExt, materialdb::MaterialExt, paymentdb::PaymentExt, trackingdb::TrackingExt,
    userdb::UserExt,
};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("size", &self.pool.size())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// Everything the services need from persistence, as one object-safe bound.
pub trait LogisticsStore:
    MaterialExt + JobExt + TrackingExt + PaymentExt + UserExt + Send + Sync
{
}

impl<T> LogisticsStore for T where
    T: MaterialExt + JobExt + TrackingExt + PaymentExt + UserExt + Send + Sync
{
}
