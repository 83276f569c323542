//! `reports/<component>/index.html`: points at the newest numbered report.

use crate::environment::Component;

pub const INDEX_FILE: &str = "index.html";

/// Moves to the report, busting caches with a timestamp. Embedded in the site
/// frame it first tells the parent the routed path (`<base><route>/<id>`) so
/// the address bar and breadcrumb follow. `base_path` is the site URL path
/// and is used when the frame did not receive `window.basePath`.
pub fn redirect_page(component: Component, report_id: u64, base_path: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<body>
    <script>
        if (window.parent !== window) {{
            var base = window.basePath || {base};
            window.parent.postMessage({{ type: "iframeNavigation", path: base + "{route}/{id}" }}, "*")
        }}
        window.location.href = "{id}/?c=" + Date.now()
    </script>
</body>
</html>
"#,
        base = js_string(base_path),
        route = component.route_segment(),
        id = report_id,
    )
}

/// `path` as a JS string literal, always ending with `/`.
pub(crate) fn js_string(path: &str) -> String {
    let mut path = path.to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    serde_json::Value::String(path).to_string()
}
