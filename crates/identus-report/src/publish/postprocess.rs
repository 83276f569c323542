//! Rewrites applied to the rendered report so it behaves inside the site frame.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use crate::environment::Component;
use crate::error::{ReportError, ReportResult};
use crate::io;
use crate::publish::redirect::js_string;

pub const APP_JS: &str = "app.js";

const BUILD_LINK: &str =
    r#"return'                    <a class="link" href="'+a(i(null!=e?s(e,"buildUrl"):e,e))"#;
const BUILD_LINK_NEW_TAB: &str = r#"return'                    <a class="link" target="_blank" href="'+a(i(null!=e?s(e,"buildUrl"):e,e))"#;

const NAVIGATION_MARKER: &str = "/* identus-report: iframe navigation */";

/// `component -> route segment` for every known component, as a JS object literal.
fn route_table() -> String {
    let table: BTreeMap<&str, &str> = Component::ALL
        .into_iter()
        .map(|c| (c.as_str(), c.route_segment()))
        .collect();
    serde_json::to_string(&table).unwrap_or_else(|_| "{}".to_string())
}

/// Script that reports clicks on `/reports/<component>/<id>` links to the
/// parent window as `{type: "iframeNavigation", path: "<base><route>/<id>"}`
/// and then moves the frame to the link target.
pub fn navigation_script(base_path: &str) -> String {
    format!(
        r#"
{marker}
(function () {{
    var routes = {routes};
    var base = window.basePath || {base};
    var pattern = /\/reports\/([^\/]+)\/([^\/?#]+)/;
    document.addEventListener("click", function (event) {{
        if (window.parent === window) return;
        var link = event.target && event.target.closest ? event.target.closest("a[href]") : null;
        if (!link) return;
        var match = pattern.exec(link.getAttribute("href"));
        if (!match || !(match[1] in routes)) return;
        event.preventDefault();
        window.parent.postMessage({{ type: "iframeNavigation", path: base + routes[match[1]] + "/" + match[2] }}, "*");
        window.location.href = link.href;
    }}, true);
}})();
"#,
        marker = NAVIGATION_MARKER,
        routes = route_table(),
        base = js_string(base_path),
    )
}

/// Apply both rewrites to an `app.js` body. Applying twice changes nothing.
pub fn rewrite_app_js(source: &str, base_path: &str) -> String {
    let mut out = source.replace(BUILD_LINK, BUILD_LINK_NEW_TAB);
    if !out.contains(NAVIGATION_MARKER) {
        out.push_str(&navigation_script(base_path));
    }
    out
}

/// Rewrite `<report_dir>/app.js` in place. A report without `app.js` is left alone.
pub async fn postprocess_report(report_dir: &Path, base_path: &str) -> ReportResult<bool> {
    let path = report_dir.join(APP_JS);
    let source = match fs::read_to_string(&path).await {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(report = %report_dir.display(), "rendered report has no app.js, skipping post-processing");
            return Ok(false);
        }
        Err(e) => return Err(ReportError::io(&path, e)),
    };
    io::write_atomic(&path, &rewrite_app_js(&source, base_path)).await?;
    debug!(path = %path.display(), "post-processed app.js");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_link_opens_new_tab() {
        let src = format!("var x=1;{}+'\">';", BUILD_LINK);
        let out = rewrite_app_js(&src, "/");
        assert!(out.contains(r#"<a class="link" target="_blank" href=""#));
        assert!(!out.contains(BUILD_LINK));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = rewrite_app_js("var x=1;", "/integration/");
        assert_eq!(rewrite_app_js(&once, "/integration/"), once);
        assert_eq!(once.matches(NAVIGATION_MARKER).count(), 1);
    }

    #[test]
    fn test_navigation_posts_base_path_and_follows_link() {
        let script = navigation_script("/integration");
        assert!(script.contains(r#"var base = window.basePath || "/integration/";"#));
        assert!(script.contains(r#"path: base + routes[match[1]] + "/" + match[2]"#));
        let posted = script.find("window.parent.postMessage").unwrap();
        let followed = script.find("window.location.href = link.href;").unwrap();
        assert!(followed > posted);
    }

    #[test]
    fn test_route_table_maps_sdks() {
        let table: BTreeMap<String, String> = serde_json::from_str(&route_table()).unwrap();
        assert_eq!(table["sdk-ts"], "typescript");
        assert_eq!(table["sdk-kmp"], "kotlin");
        assert_eq!(table["sdk-swift"], "swift");
        assert_eq!(table["cloud-agent"], "cloud-agent");
        assert_eq!(table.len(), Component::ALL.len());
    }

    #[tokio::test]
    async fn test_missing_app_js_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!postprocess_report(tmp.path(), "/").await.unwrap());
        std::fs::write(tmp.path().join(APP_JS), "var x=1;").unwrap();
        assert!(postprocess_report(tmp.path(), "/").await.unwrap());
        let body = std::fs::read_to_string(tmp.path().join(APP_JS)).unwrap();
        assert!(body.contains("iframeNavigation"));
    }
}
