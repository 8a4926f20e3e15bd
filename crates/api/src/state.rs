use std::sync::Arc;
use std::time::Duration;

use shipwatch_core::equipment::{EquipmentLookup, MonitoringPointCatalog};
use shipwatch_core::identity::IdentityVerifier;
use shipwatch_events::EquipmentIdCache;
use shipwatch_pipeline::store::{PgEquipmentLookup, PgMonitoringPointCatalog, PgStore};
use shipwatch_pipeline::{IngestionPipeline, LiveIngestor, ThresholdEvaluator};

use crate::auth::jwt::JwtIdentityVerifier;
use crate::config::ServerConfig;
use crate::notifications::NotificationFanout;
use crate::ws::ConnectionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: shipwatch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Verifies bearer tokens for both HTTP and WebSocket handshakes.
    pub identity: Arc<dyn IdentityVerifier>,
    /// Live WebSocket connections and their rooms.
    pub registry: Arc<ConnectionRegistry>,
    pub fanout: Arc<NotificationFanout>,
    pub equipment_cache: Arc<EquipmentIdCache>,
    /// Batch import of historical readings.
    pub ingestion: Arc<IngestionPipeline>,
    /// Single readings from the streaming feed.
    pub live: Arc<LiveIngestor>,
}

impl AppState {
    /// Wire the production collaborators over one pool.
    pub fn new(pool: shipwatch_db::DbPool, config: ServerConfig) -> Self {
        let identity: Arc<dyn IdentityVerifier> =
            Arc::new(JwtIdentityVerifier::new(config.jwt.clone()));

        let store = Arc::new(PgStore::new(pool.clone()));
        let equipment: Arc<dyn EquipmentLookup> = Arc::new(PgEquipmentLookup::new(pool.clone()));
        let catalog: Arc<dyn MonitoringPointCatalog> =
            Arc::new(PgMonitoringPointCatalog::new(pool.clone()));

        let equipment_cache = Arc::new(EquipmentIdCache::new(
            Arc::clone(&equipment),
            Duration::from_secs(config.realtime.equipment_cache_ttl_secs),
        ));
        let registry = Arc::new(
            ConnectionRegistry::new(Arc::clone(&identity), config.realtime.offline_buffer_capacity)
                .with_buffer_ttl(Duration::from_secs(config.realtime.offline_buffer_ttl_secs)),
        );
        let fanout = Arc::new(NotificationFanout::new(
            Arc::clone(&registry),
            Arc::clone(&equipment_cache),
        ));

        let evaluator = Arc::new(ThresholdEvaluator::new(store.clone(), store.clone()));
        let ingestion = Arc::new(
            IngestionPipeline::new(
                store.clone(),
                store.clone(),
                Arc::clone(&equipment),
                Arc::clone(&catalog),
                Arc::clone(&evaluator),
                fanout.clone(),
            )
            .with_chunk_size(config.import.chunk_size),
        );
        let live = Arc::new(LiveIngestor::new(
            store.clone(),
            store,
            equipment,
            catalog,
            Arc::clone(&equipment_cache),
            evaluator,
            fanout.clone(),
        ));

        Self {
            pool,
            config: Arc::new(config),
            identity,
            registry,
            fanout,
            equipment_cache,
            ingestion,
            live,
        }
    }
}
