//! Reviewer page served at `/`.
//!
//! The page is rendered from the store on every request. Approve and reject
//! buttons call the JSON API and reload; the page also reloads itself every
//! few seconds so new queries show up without manual refresh.

use warden_core::{QueryRecord, QueryStatus};

/// Seconds between automatic page reloads.
const REFRESH_SECS: u32 = 5;

/// Render the reviewer page for the given records, newest first.
pub fn queries_page(records: &[QueryRecord]) -> String {
    let pending = records.iter().filter(|r| r.is_pending()).count();
    let cards: String = if records.is_empty() {
        r#"<p class="empty">No queries found.</p>"#.to_string()
    } else {
        records.iter().map(query_card).collect()
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Warden - Query Approvals</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 40px; color: #1f2937; }}
        .query-item {{ border: 1px solid #ddd; margin: 10px 0; padding: 15px; border-radius: 5px; }}
        .pending {{ border-left: 5px solid orange; }}
        .approved {{ border-left: 5px solid green; }}
        .rejected {{ border-left: 5px solid red; }}
        .query-text {{ background: #f5f5f5; padding: 10px; border-radius: 3px; font-family: monospace; white-space: pre-wrap; }}
        .meta {{ color: #6b7280; font-size: 0.9em; }}
        button {{ margin: 5px; padding: 8px 15px; border: none; border-radius: 3px; cursor: pointer; color: white; }}
        .approve-btn {{ background: #4CAF50; }}
        .reject-btn {{ background: #f44336; }}
        .refresh-btn {{ background: #2196F3; }}
    </style>
</head>
<body>
    <h1>Query Approvals</h1>
    <p class="meta">{pending} pending of {total}</p>
    <button class="refresh-btn" onclick="location.reload()">Refresh</button>
    <div id="queries">{cards}</div>
    <script>
        async function decide(id, action, body) {{
            const options = {{ method: 'POST' }};
            if (body) {{
                options.headers = {{ 'Content-Type': 'application/json' }};
                options.body = JSON.stringify(body);
            }}
            const response = await fetch(`/queries/${{id}}/${{action}}`, options);
            if (!response.ok) {{
                const result = await response.json().catch(() => ({{}}));
                alert(result.error || `Request failed with status ${{response.status}}`);
            }}
            location.reload();
        }}

        function approveQuery(id) {{
            decide(id, 'approve');
        }}

        function rejectQuery(id) {{
            const reason = prompt('Enter rejection reason:');
            if (reason !== null) {{
                decide(id, 'reject', {{ reason }});
            }}
        }}

        setInterval(() => location.reload(), {refresh_ms});
    </script>
</body>
</html>"##,
        pending = pending,
        total = records.len(),
        cards = cards,
        refresh_ms = REFRESH_SECS * 1000,
    )
}

fn query_card(record: &QueryRecord) -> String {
    let actions = if record.status == QueryStatus::Pending {
        format!(
            r#"<button class="approve-btn" onclick="approveQuery('{id}')">Approve</button>
            <button class="reject-btn" onclick="rejectQuery('{id}')">Reject</button>"#,
            id = record.id,
        )
    } else {
        String::new()
    };

    let resolution = match (&record.resolved_at, &record.rejection_reason) {
        (Some(at), Some(reason)) => format!(
            r#"<p class="meta">Resolved {} - reason: {}</p>"#,
            at.format("%Y-%m-%d %H:%M:%S"),
            escape_html(reason)
        ),
        (Some(at), None) => format!(
            r#"<p class="meta">Resolved {}</p>"#,
            at.format("%Y-%m-%d %H:%M:%S")
        ),
        _ => String::new(),
    };

    format!(
        r#"<div class="query-item {status}">
            <h3>Query ID: {id}</h3>
            <p><strong>Status:</strong> {status}</p>
            <p><strong>Submitter:</strong> {submitter}</p>
            <p><strong>Submitted:</strong> {created_at}</p>
            <div class="query-text">{query}</div>
            {resolution}
            {actions}
        </div>"#,
        status = record.status,
        id = record.id,
        submitter = escape_html(&record.submitter),
        created_at = record.created_at.format("%Y-%m-%d %H:%M:%S"),
        query = escape_html(&record.query),
        resolution = resolution,
        actions = actions,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
