/*!
 * Caption production for single images.
 *
 * - `model`: the immutable `Caption` record and content hashing
 * - `cache`: persistent, content-addressed caption cache
 * - `resolver`: policy that combines authored alt text, the cache and a
 *   description provider into a `CaptionOutcome`
 */

pub mod cache;
pub mod model;
pub mod resolver;

pub use cache::CaptionCache;
pub use model::{Caption, content_hash};
pub use resolver::{CaptionOutcome, CaptionPolicy, CaptionResolver, CaptionWarning};
