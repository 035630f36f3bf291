//! Dev aliases for live editing.
//!
//! In live mode referenced diagrams are served from a URL keyed by source
//! path rather than content, so a browser showing the page picks up the new
//! render after the file changes. Each alias is a copy of the current hashed
//! asset at `<theme>/dev/<key>.svg`.

use figura_store::{AssetStore, Theme};

use crate::error::DiagramError;
use crate::hash::dev_alias_key;
use crate::job::RenderJob;

/// Copy hashed assets to the dev alias of every referenced source file.
///
/// Returns the number of source files whose light alias was published.
pub fn publish_dev_aliases(store: &AssetStore, jobs: &[RenderJob]) -> Result<usize, DiagramError> {
    let mut published = 0;
    for job in jobs {
        for source in &job.sources {
            let key = dev_alias_key(source);
            let mut light = false;
            for theme in Theme::ALL {
                let copied = store.publish_alias(theme, job.hash.as_str(), &key)?;
                light |= copied && theme == Theme::Light;
            }
            if light {
                published += 1;
            } else {
                tracing::warn!(source = %source.display(), hash = %job.hash, "no asset to alias");
            }
        }
    }
    tracing::debug!(published, "published dev aliases");
    Ok(published)
}
