use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::audit::AuditLog;
use crate::cache::lookup::CachedSource;
use crate::cache::store::DocumentStore;
use crate::cache::{MemoryCache, ResponseCache};
use crate::cli::SourceArgs;
use crate::clients::{EnsemblClient, PanelAppClient, RetryPolicy, TarkClient};
use crate::resolve::memory::InMemorySource;
use crate::resolve::source::{AnnotationSource, PanelSource, VariantSource};
use crate::resolve::{ResolverOptions, Resolvers};

pub const CACHE_FILE: &str = "cache.json";
pub const AUDIT_FILE: &str = "audit.jsonl";

/// Collaborators and local state shared by the subcommands
pub struct Context {
    pub annotation: Arc<dyn AnnotationSource>,
    pub variants: Arc<dyn VariantSource>,
    pub panels: Arc<dyn PanelSource>,
    pub db_dir: PathBuf,
}

impl Context {
    /// Wire collaborators from the global flags.
    ///
    /// A fixture is never cached on disk, so it cannot leak into later
    /// network runs.
    ///
    /// # Errors
    ///
    /// Fails if the fixture, the cache, or an HTTP client cannot be set up.
    pub fn from_args(args: &SourceArgs) -> anyhow::Result<Self> {
        let db_dir = args.db_dir();

        if let Some(path) = &args.fixture {
            info!("Using fixture {}", path.display());
            let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
            let fixture = InMemorySource::from_json(path)?;
            let source = Arc::new(CachedSource::new(fixture, cache, args.assembly));
            return Ok(Self {
                annotation: source.clone(),
                variants: source.clone(),
                panels: source,
                db_dir,
            });
        }

        let cache: Arc<dyn ResponseCache> = if args.no_cache {
            Arc::new(MemoryCache::new())
        } else {
            let path = db_dir.join(CACHE_FILE);
            debug!("Response cache at {}", path.display());
            Arc::new(DocumentStore::open(&path)?)
        };

        let retry = RetryPolicy::default();
        Ok(Self {
            annotation: Arc::new(CachedSource::new(
                TarkClient::new(&args.tark_url, args.assembly, retry)?,
                cache.clone(),
                args.assembly,
            )),
            variants: Arc::new(CachedSource::new(
                EnsemblClient::new(args.ensembl_url(), retry)?,
                cache.clone(),
                args.assembly,
            )),
            panels: Arc::new(CachedSource::new(
                PanelAppClient::new(&args.panelapp_url, args.assembly, retry)?,
                cache,
                args.assembly,
            )),
            db_dir,
        })
    }

    #[must_use]
    pub fn resolvers(&self, options: ResolverOptions) -> Resolvers<'_> {
        Resolvers::new(self.annotation.as_ref(), self.variants.as_ref(), options)
    }

    #[must_use]
    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.db_dir.join(AUDIT_FILE))
    }
}
