/*!
 * End-to-end rewrite of a small site with a shared caption cache
 */

use altwriter::captioning::{CaptionCache, CaptionPolicy, CaptionResolver};
use altwriter::document::{DocumentRewriter, RewriteOptions};
use altwriter::providers::mock::MockProvider;
use anyhow::Result;
use std::fs;

use crate::common;

/// Documents in different folders that reference one image through
/// different relative paths share one provider call and one cache entry
#[tokio::test]
async fn test_siteRewrite_withSharedImage_shouldDescribeOnceAndSurviveRestart() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path().canonicalize()?;
    let image = common::create_test_image(&root, "site/a/b/x/y/img.png", "shared")?;
    let deep = common::create_test_file(
        &root,
        "site/a/b/c/page.html",
        &common::html_page(r#"<figure><img src="x/y/img.png" /></figure>"#),
    )?;
    let shallow = common::create_test_file(
        &root,
        "site/a/other.html",
        &common::html_page(r#"<img class="thumb" src="b/x/y/img.png" />"#),
    )?;
    let cache_path = root.join("captions.json");
    let description = MockProvider::caption_for(&fs::read(&image)?);

    let provider = MockProvider::working();
    {
        let cache = CaptionCache::load(&cache_path);
        let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
        let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

        for page in [&deep, &shallow] {
            let document = rewriter.rewrite(page).await?;
            assert!(document.is_changed());
            document.write().await?;
        }
    }

    assert_eq!(provider.request_count(), 1);
    assert!(fs::read_to_string(&deep)?.contains(&format!(r#"<img alt="{}" src="x/y/img.png" />"#, description)));
    assert!(fs::read_to_string(&shallow)?.contains(&format!(
        r#"<img alt="{}" class="thumb" src="b/x/y/img.png" />"#,
        description
    )));

    // A fresh process sees the cached caption and never reaches the provider
    let fresh_page = common::create_test_file(
        &root,
        "site/a/b/c/fresh.html",
        &common::html_page(r#"<img src="x/y/img.png" />"#),
    )?;
    let cache = CaptionCache::load(&cache_path);
    let provider = MockProvider::failing();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&fresh_page).await?;

    assert_eq!(provider.request_count(), 0);
    assert!(document.skipped().is_empty());
    assert_eq!(document.captions()[0].description(), description);
    assert_eq!(document.captions()[0].display_name(), "img.png");
    Ok(())
}

#[tokio::test]
async fn test_siteRewrite_withMixedImages_shouldOnlyTouchImageTags() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path().canonicalize()?;
    common::create_test_image(&root, "assets/one.png", "one")?;
    common::create_test_image(&root, "assets/two.jpg", "two")?;
    let body = r#"<nav><a href="/">Home</a></nav>
<img src="/assets/one.png" width="40" height=40 />
<img src="assets/two.jpg" alt="Hand-written description" />
<img src="assets/three.png" />
<textarea><img src="assets/one.png" /></textarea>
<p>Footer &copy; 2024</p>"#;
    let page = common::create_test_file(&root, "index.html", &common::html_page(body))?;

    let cache = CaptionCache::load(root.join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;
    let content = document.text();

    assert_eq!(provider.request_count(), 1);
    assert_eq!(document.captions().len(), 2);
    assert_eq!(document.skipped().len(), 1);
    assert!(content.contains(r#"width="40" height=40 />"#));
    assert!(content.contains(r#"<img alt="Hand-written description" src="assets/two.jpg" />"#));
    assert!(content.contains(r#"<img src="assets/three.png" />"#));
    assert!(content.contains(r#"<textarea><img src="assets/one.png" /></textarea>"#));
    assert!(content.contains("<p>Footer &copy; 2024</p>"));
    assert_eq!(cache.len(), 1);
    Ok(())
}
