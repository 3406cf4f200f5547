/*!
 * Tests for image tag rewriting
 */

use altwriter::captioning::{CaptionCache, CaptionPolicy, CaptionResolver};
use altwriter::document::{DocumentRewriter, RewriteOptions};
use altwriter::errors::{CaptionError, DocumentError};
use altwriter::providers::mock::MockProvider;
use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::common;

fn caption_of(image: &Path) -> Result<String> {
    Ok(MockProvider::caption_for(&fs::read(image)?))
}

#[tokio::test]
async fn test_rewrite_shouldFillAltAndKeepEverythingElse() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let image = common::create_test_image(temp_dir.path(), "img/a.png", "a")?;
    let body = r#"<p class="intro">Hi &amp; welcome</p>
<img src="img/a.png" class="hero" />
<!-- <img src="img/a.png" /> -->
<script>var s = "<img src='img/a.png' />";</script>"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", &common::html_page(body))?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    let expected_tag = format!(r#"<img alt="{}" src="img/a.png" class="hero" />"#, caption_of(&image)?);
    let expected = common::html_page(&body.replacen(r#"<img src="img/a.png" class="hero" />"#, &expected_tag, 1));
    assert_eq!(document.text(), expected);
    assert!(document.is_changed());
    assert_eq!(document.captions().len(), 1);
    assert_eq!(provider.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withOwnOutput_shouldBeIdempotent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_image(temp_dir.path(), "img/a.png", "a")?;
    common::create_test_image(temp_dir.path(), "img/b.png", "b")?;
    let body = r#"<img src="img/a.png"/><p>between</p><IMG SRC='img/b.png' width=20 alt="" />"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", &common::html_page(body))?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let first = rewriter.rewrite(&page).await?;
    first.write().await?;
    let second = rewriter.rewrite(&page).await?;

    assert_eq!(second.content(), first.content());
    assert!(!second.is_changed());
    assert_eq!(provider.request_count(), 2);
    assert!(second.captions().iter().all(|c| c.is_authored()));
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withAuthoredAlt_shouldKeepItAndMoveItFirst() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let body = r#"<img src="missing.png" data-x='1' alt='Our "team" &amp; friends' />"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", body)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    assert_eq!(
        document.text(),
        r#"<img alt='Our "team" &amp; friends' src="missing.png" data-x='1' />"#
    );
    assert_eq!(provider.request_count(), 0);
    assert!(document.skipped().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withCanonicalAuthoredTag_shouldReportUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let body = r#"<img alt="Logo" src="logo.png" />"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", body)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    assert_eq!(document.text(), body);
    assert!(!document.is_changed());
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withNonSelfClosingImage_shouldLeaveItUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let body = r#"<img src="a.png"><img src="a.png" alt="">"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", body)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    assert_eq!(document.text(), body);
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withMissingImage_shouldSkipItAndContinue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let image = common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let body = r#"<img src="ghost-5d1e.png" /><img src="a.png" />"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", body)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    let expected = format!(
        r#"<img src="ghost-5d1e.png" /><img alt="{}" src="a.png" />"#,
        caption_of(&image)?
    );
    assert_eq!(document.text(), expected);
    assert_eq!(document.skipped().len(), 1);
    assert_eq!(document.skipped()[0].reference, "ghost-5d1e.png");
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withNoCandidates_shouldLeaveTagsAndProcessLaterImages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_image(temp_dir.path(), "a.png", "a")?;
    common::create_test_image(temp_dir.path(), "b.png", "b")?;
    let body = r#"<img src="a.png" /><img src="b.png" />"#;
    let page = common::create_test_file(temp_dir.path(), "index.html", body)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::empty();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    assert_eq!(document.text(), body);
    assert!(!document.is_changed());
    assert_eq!(document.skipped().len(), 2);
    assert_eq!(provider.request_count(), 2);
    assert!(cache.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withLowConfidence_shouldFillAltAndFlag() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let image = common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let page = common::create_test_file(temp_dir.path(), "index.html", r#"<img src="a.png" />"#)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::low_confidence(0.5);
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    assert_eq!(
        document.text(),
        format!(r#"<img alt="{}" src="a.png" />"#, caption_of(&image)?)
    );
    assert_eq!(document.flagged().len(), 1);
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withProviderFailure_shouldSkipByDefault() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let page = common::create_test_file(temp_dir.path(), "index.html", r#"<img src="a.png" />"#)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::failing();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    assert!(!document.is_changed());
    assert_eq!(document.skipped().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withProviderFailureAndAbortFlag_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let page = common::create_test_file(temp_dir.path(), "index.html", r#"<img src="a.png" />"#)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::failing();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let options = RewriteOptions {
        abort_on_provider_error: true,
    };
    let rewriter = DocumentRewriter::new(&resolver, options);

    let err = rewriter.rewrite(&page).await.unwrap_err();

    assert!(matches!(err, DocumentError::Caption(CaptionError::Provider(_))));
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withUnterminatedTag_shouldReportMalformedMarkup() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let page = common::create_test_file(temp_dir.path(), "index.html", r#"<p>ok</p><img src="a.png" "#)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let err = rewriter.rewrite(&page).await.unwrap_err();

    assert!(matches!(err, DocumentError::MalformedTokenStream { offset: 9, .. }));
    Ok(())
}

#[tokio::test]
async fn test_rewrite_withNonHtmlFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let notes = common::create_test_file(temp_dir.path(), "notes.txt", r#"<img src="a.png" />"#)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let err = rewriter.rewrite(&notes).await.unwrap_err();

    assert!(matches!(err, DocumentError::NotHtml(_)));
    Ok(())
}

#[tokio::test]
async fn test_write_shouldPersistRewrittenContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let page = common::create_test_file(temp_dir.path(), "index.html", r#"<img src="a.png" />"#)?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;
    assert_eq!(fs::read_to_string(&page)?, r#"<img src="a.png" />"#);

    document.write().await?;
    assert_eq!(fs::read(&page)?, document.content());
    Ok(())
}

/// Pages in a legacy single-byte encoding keep every byte outside the
/// rewritten tag
#[tokio::test]
async fn test_rewrite_withLatin1Document_shouldPreserveBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let image = common::create_test_image(temp_dir.path(), "a.png", "a")?;
    let page = common::create_test_bytes(
        temp_dir.path(),
        "index.html",
        b"<p>caf\xe9</p><img src=\"a.png\" /><p>cr\xe8me</p>",
    )?;

    let cache = CaptionCache::load(temp_dir.path().join("captions.json"));
    let provider = MockProvider::working();
    let resolver = CaptionResolver::new(&cache, &provider, CaptionPolicy::default());
    let rewriter = DocumentRewriter::new(&resolver, RewriteOptions::default());

    let document = rewriter.rewrite(&page).await?;

    let mut expected = b"<p>caf\xe9</p>".to_vec();
    expected.extend_from_slice(format!(r#"<img alt="{}" src="a.png" />"#, caption_of(&image)?).as_bytes());
    expected.extend_from_slice(b"<p>cr\xe8me</p>");
    assert_eq!(document.content(), expected.as_slice());
    assert_eq!(document.captions().len(), 1);

    document.write().await?;
    assert_eq!(fs::read(&page)?, expected);
    Ok(())
}
