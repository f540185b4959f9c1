//! HTML pages for browsing the photo tree.
//!
//! Two pages, both rendered with [maud](https://maud.lambda.xyz/) so every
//! interpolated file name is escaped:
//!
//! - **Gallery** (`/gallery/{dir}`): breadcrumb, subdirectory links, and a
//!   grid of thumbnails (`/thumb/...`) linking to the view page.
//! - **View** (`/view/{dir}/{image}`): the `small` derivative linking to the
//!   original, with previous/next links among the sibling images.
//!
//! Link targets are percent-encoded per path segment so names with spaces or
//! `#` survive the round trip through the router.

use crate::listing::{DirContents, segments};
use maud::{DOCTYPE, Markup, html};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const CSS: &str = "\
body{margin:0;font-family:system-ui,sans-serif;background:#111;color:#ddd}\
a{color:#9cf;text-decoration:none}\
header.site-header{padding:.75rem 1rem;border-bottom:1px solid #333}\
ul.subdirs{list-style:none;padding:0 1rem;display:flex;flex-wrap:wrap;gap:.5rem 1.5rem}\
div.thumbnail-grid{display:flex;flex-wrap:wrap;gap:4px;padding:1rem}\
div.thumbnail-grid img{display:block}\
main.image-page{text-align:center;padding:1rem}\
main.image-page img{max-width:100%}\
nav.pager{display:flex;justify-content:space-between;padding:1rem}";

/// Route prefix + percent-encoded request path.
pub fn route_url(route: &str, rel: &str) -> String {
    let mut url = format!("/{route}");
    for seg in segments(rel) {
        url.push('/');
        url.extend(utf8_percent_encode(seg, SEGMENT));
    }
    url
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                (content)
            }
        }
    }
}

/// Breadcrumb links for every ancestor of `rel`, the last segment unlinked
/// unless `link_last` is set.
fn breadcrumb(rel: &str, link_last: bool) -> Markup {
    let segs = segments(rel);
    html! {
        header.site-header {
            nav.breadcrumb {
                @if segs.is_empty() && !link_last {
                    "Gallery"
                } @else {
                    a href="/gallery/" { "Gallery" }
                }
                @for (idx, seg) in segs.iter().enumerate() {
                    " › "
                    @if idx + 1 == segs.len() && !link_last {
                        (seg)
                    } @else {
                        a href={ (route_url("gallery", &segs[..=idx].join("/"))) "/" } { (seg) }
                    }
                }
            }
        }
    }
}

fn page_title(rel: &str) -> String {
    match segments(rel).last() {
        Some(last) => format!("{last} - proofsheet"),
        None => "proofsheet".to_string(),
    }
}

/// Directory page: subdirectories then a thumbnail grid.
pub fn render_gallery(contents: &DirContents) -> Markup {
    let content = html! {
        (breadcrumb(&contents.path, false))
        main.gallery-page {
            @if !contents.subdirs.is_empty() {
                ul.subdirs {
                    @for dir in &contents.subdirs {
                        li {
                            a href={ (route_url("gallery", &contents.child_path(dir))) "/" } { (dir) "/" }
                        }
                    }
                }
            }
            @if contents.images.is_empty() && contents.subdirs.is_empty() {
                p.empty { "No images here." }
            }
            div.thumbnail-grid {
                @for image in &contents.images {
                    @let rel = contents.child_path(image);
                    a.thumb-link href=(route_url("view", &rel)) title=(image) {
                        img src=(route_url("thumb", &rel)) alt=(image) loading="lazy";
                    }
                }
            }
        }
    };

    base_document(&page_title(&contents.path), content)
}

/// Single-image page for `name` inside `contents`.
pub fn render_view(contents: &DirContents, name: &str) -> Markup {
    let rel = contents.child_path(name);
    let (prev, next) = contents.neighbors(name);
    let parent_url = format!("{}/", route_url("gallery", &contents.path));

    let content = html! {
        (breadcrumb(&contents.path, true))
        main.image-page {
            h1 { (name) }
            a href=(route_url("original", &rel)) {
                img src=(route_url("small", &rel)) alt=(name);
            }
        }
        nav.pager {
            @if let Some(prev) = prev {
                a.prev href=(route_url("view", &contents.child_path(prev))) rel="prev" { "‹ " (prev) }
            } @else {
                span {}
            }
            a.up href=(parent_url) { "Index" }
            @if let Some(next) = next {
                a.next href=(route_url("view", &contents.child_path(next))) rel="next" { (next) " ›" }
            } @else {
                span {}
            }
        }
    };

    base_document(&page_title(&rel), content)
}
