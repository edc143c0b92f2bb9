//! Markup extraction for search pages and public article pages.
//!
//! Every result block is parsed on its own. A block that lacks its required
//! link is skipped; the remaining blocks keep their relative order.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::types::{
    format_timestamp, reading_stats, AccountSearchResult, PublicArticle, SearchResult,
};

const UNKNOWN_ACCOUNT: &str = "Unknown account";
const UNTITLED: &str = "Untitled";
const UNKNOWN_AUTHOR: &str = "Unknown author";
const ARTICLE_BODY: &str = "#js_content, div.rich_media_content";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("selector is valid")
}

fn time_convert_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"timeConvert\('(\d+)'\)").expect("timeConvert regex is valid"))
}

fn time_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\d\-\s:]").expect("time noise regex is valid"))
}

/// Extract article hits from a search page. Relative links resolve against `base`.
pub fn search_results(html: &str, base: &Url, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let mut blocks: Vec<ElementRef> = document.select(&selector("ul.news-list > li")).collect();
    if blocks.is_empty() {
        blocks = document.select(&selector("div.news-box")).collect();
    }

    let title_sel = selector("h3 a");
    let account_sel = selector("a.account, span.all-time-y2");
    let digest_sel = selector("p.txt-info");
    let time_sel = selector("span.s2");

    blocks
        .into_iter()
        .filter_map(|block| {
            let link = block.select(&title_sel).next()?;
            let href = link.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let url = base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string());

            let account = block
                .select(&account_sel)
                .next()
                .map(|e| text_of(&e))
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string());

            Some(SearchResult {
                title: text_of(&link),
                account,
                url,
                digest: first_text(&block, &digest_sel),
                publish_time: block
                    .select(&time_sel)
                    .next()
                    .map(|e| publish_time(&e))
                    .unwrap_or_default(),
            })
        })
        .take(limit)
        .collect()
}

/// Extract account hits from an account search page.
pub fn account_results(html: &str, limit: usize) -> Vec<AccountSearchResult> {
    let document = Html::parse_document(html);
    let mut blocks: Vec<ElementRef> = document.select(&selector("ul.news-list2 > li")).collect();
    if blocks.is_empty() {
        blocks = document.select(&selector("div.results")).collect();
    }

    let name_sel = selector("p.tit a, h3 a");
    let id_sel = selector(r#"label[name="em_weixinhao"]"#);
    let desc_sel = selector("dl dd, dd");
    let verified_sel = selector("i.identify, .sp-ico");

    blocks
        .into_iter()
        .filter_map(|block| {
            let name = text_of(&block.select(&name_sel).next()?);
            if name.is_empty() {
                return None;
            }
            Some(AccountSearchResult {
                name,
                wechat_id: block
                    .select(&id_sel)
                    .next()
                    .map(|e| text_of(&e))
                    .filter(|id| !id.is_empty()),
                description: first_text(&block, &desc_sel),
                verified: block.select(&verified_sel).next().is_some(),
            })
        })
        .take(limit)
        .collect()
}

/// Extract a public article page.
pub fn public_article(html: &str, url: &str) -> PublicArticle {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = Some(first_text(&root, &selector("#activity-name, h1.rich_media_title")))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let author = Some(first_text(&root, &selector("#js_name, a.rich_media_meta_link")))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let publish_time = first_text(&root, &selector("em#publish_time"));

    let (content, images) = match document
        .select(&selector(ARTICLE_BODY))
        .next()
    {
        Some(body) => (body_text(&body), image_sources(&body)),
        None => {
            tracing::debug!("No article body found at {url}");
            (String::new(), Vec::new())
        }
    };

    let (word_count, read_time_minutes) = reading_stats(&content);
    PublicArticle {
        title,
        author,
        publish_time,
        content,
        url: url.to_string(),
        images,
        word_count,
        read_time_minutes,
    }
}

/// Whether a page carries an article body container.
pub fn has_article_body(html: &str) -> bool {
    Html::parse_document(html)
        .select(&selector(ARTICLE_BODY))
        .next()
        .is_some()
}

/// Plain text of an HTML fragment, one text run per line.
pub fn html_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    body_text(&fragment.root_element())
}

/// Concatenated, trimmed text runs of an element.
fn text_of(element: &ElementRef) -> String {
    element.text().map(str::trim).collect::<String>()
}

fn first_text(scope: &ElementRef, sel: &Selector) -> String {
    scope
        .select(sel)
        .next()
        .map(|e| text_of(&e))
        .unwrap_or_default()
}

fn publish_time(element: &ElementRef) -> String {
    let markup = element.inner_html();
    if let Some(caps) = time_convert_re().captures(&markup) {
        if let Ok(secs) = caps[1].parse::<i64>() {
            return format_timestamp(secs);
        }
    }
    time_noise_re()
        .replace_all(&text_of(element), "")
        .trim()
        .to_string()
}

/// Non-empty text runs outside `script`/`style`, one per line.
fn body_text(body: &ElementRef) -> String {
    body.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| matches!(e.name(), "script" | "style"))
                });
                let text = text.trim();
                (!hidden && !text.is_empty()).then_some(text)
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn image_sources(body: &ElementRef) -> Vec<String> {
    body.select(&selector("img"))
        .filter_map(|img| {
            let attrs = img.value();
            attrs
                .attr("data-src")
                .filter(|s| !s.is_empty())
                .or_else(|| attrs.attr("src").filter(|s| !s.is_empty()))
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://weixin.sogou.com/weixin?query=rust").unwrap()
    }

    fn article_block(i: usize, with_link: bool) -> String {
        let title = if with_link {
            format!(r#"<h3><a href="/link?url=item{i}">Title {i}</a></h3>"#)
        } else {
            format!("<h3>Title {i}</h3>")
        };
        format!(
            r#"<li>{title}
                <p class="txt-info">Digest {i}</p>
                <div class="s-p"><a class="account">Account {i}</a>
                <span class="s2"><script>document.write(timeConvert('1700000000'))</script></span></div>
            </li>"#
        )
    }

    #[test]
    fn test_missing_title_link_skips_block_in_order() {
        let blocks: String = (1..=5).map(|i| article_block(i, i != 3)).collect();
        let html = format!(r#"<html><body><ul class="news-list">{blocks}</ul></body></html>"#);

        let results = search_results(&html, &base(), 10);
        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Title 1", "Title 2", "Title 4", "Title 5"]);

        let first = &results[0];
        assert_eq!(first.url, "https://weixin.sogou.com/link?url=item1");
        assert_eq!(first.account, "Account 1");
        assert_eq!(first.digest, "Digest 1");
        assert_eq!(first.publish_time, "2023-11-15 06:13:20");
    }

    #[test]
    fn test_limit_applies_after_skipping() {
        let blocks: String = (1..=5).map(|i| article_block(i, i != 1)).collect();
        let html = format!(r#"<ul class="news-list">{blocks}</ul>"#);
        let results = search_results(&html, &base(), 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Title 2");
    }

    #[test]
    fn test_plain_time_text_is_cleaned() {
        let html = r#"<div class="news-box"><h3><a href="https://mp.weixin.qq.com/s/x">T</a></h3>
            <span class="s2">发布于 2024-03-01 12:30</span></div>"#;
        let results = search_results(html, &base(), 10);
        assert_eq!(results[0].publish_time, "2024-03-01 12:30");
        assert_eq!(results[0].account, UNKNOWN_ACCOUNT);
        assert_eq!(results[0].url, "https://mp.weixin.qq.com/s/x");
    }

    #[test]
    fn test_account_results() {
        let html = r#"<ul class="news-list2">
            <li><p class="tit"><a>Rust 中文</a><i class="identify"></i></p>
                <label name="em_weixinhao">rustcn</label>
                <dl><dt>简介</dt><dd>Rust news</dd></dl></li>
            <li><p class="info">no name here</p></li>
            <li><h3><a>Plain</a></h3></li>
        </ul>"#;
        let results = account_results(html, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Rust 中文");
        assert_eq!(results[0].wechat_id.as_deref(), Some("rustcn"));
        assert_eq!(results[0].description, "Rust news");
        assert!(results[0].verified);
        assert_eq!(results[1].name, "Plain");
        assert_eq!(results[1].wechat_id, None);
        assert!(!results[1].verified);
    }

    #[test]
    fn test_public_article_extraction() {
        let html = r#"<html><body>
            <h1 class="rich_media_title" id="activity-name"> 标题 </h1>
            <a class="rich_media_meta_link" id="js_name">作者</a>
            <em id="publish_time">2024-01-02</em>
            <div class="rich_media_content" id="js_content">
                <p>第一段</p>
                <script>var tracking = 1;</script>
                <style>p { color: red; }</style>
                <p>第二段</p>
                <img data-src="https://img.example/a.png" src="data:placeholder">
                <img src="https://img.example/b.png">
            </div>
        </body></html>"#;
        let article = public_article(html, "https://mp.weixin.qq.com/s/abc");
        assert_eq!(article.title, "标题");
        assert_eq!(article.author, "作者");
        assert_eq!(article.publish_time, "2024-01-02");
        assert_eq!(article.content, "第一段\n第二段");
        assert_eq!(
            article.images,
            ["https://img.example/a.png", "https://img.example/b.png"]
        );
        assert_eq!(article.word_count, 7);
        assert_eq!(article.read_time_minutes, 1);
    }

    #[test]
    fn test_html_text_drops_markup_and_scripts() {
        let html = "<section><p>Hello <b>world</b></p><script>x()</script><p>Bye</p></section>";
        assert_eq!(html_text(html), "Hello\nworld\nBye");
    }

    #[test]
    fn test_public_article_without_body() {
        let article = public_article("<html></html>", "https://mp.weixin.qq.com/s/x");
        assert_eq!(article.title, UNTITLED);
        assert_eq!(article.author, UNKNOWN_AUTHOR);
        assert!(article.content.is_empty());
        assert!(article.images.is_empty());
    }
}
