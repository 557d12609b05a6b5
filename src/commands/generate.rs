//! Generate static files

use anyhow::Result;

use crate::cache::CacheDb;
use crate::generator::Generator;
use crate::Blog;

/// Render the listing and every known post, then persist the cache
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let mut cache = CacheDb::load(&blog.base_dir);
    let generator = Generator::new(blog)?;
    let report = generator.generate(&mut cache).await?;
    cache.save(&blog.base_dir)?;

    if !report.deferred.is_empty() {
        tracing::info!(
            "{} posts will be rendered on first request: {}",
            report.deferred.len(),
            report.deferred.join(", ")
        );
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
