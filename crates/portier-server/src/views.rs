//! HTML pages
//!
//! The login form posts `username`, `password` and the hidden `request_uri`
//! back to the base path.

/// Login form, with an optional error message and original location
pub fn login_page(action: &str, error: Option<&str>, request_uri: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, html_escape(e)))
        .unwrap_or_default();
    let request_uri = html_escape(request_uri.unwrap_or(""));

    layout(
        "Sign in",
        &format!(
            r#"<form method="post" action="{action}">
{error}
<label for="username">Username</label>
<input id="username" name="username" type="text" autocomplete="username" autofocus required>
<label for="password">Password</label>
<input id="password" name="password" type="password" autocomplete="current-password" required>
<input name="request_uri" type="hidden" value="{request_uri}">
<button type="submit">Sign in</button>
</form>"#,
            action = html_escape(action),
        ),
    )
}

/// Shown to users who already hold a session
pub fn authenticated_page(name: &str, logout: &str) -> String {
    layout(
        "Signed in",
        &format!(
            r#"<p>You are signed in as <strong>{}</strong>.</p>
<p><a href="{}">Sign out</a></p>"#,
            html_escape(name),
            html_escape(logout)
        ),
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_page_escapes_inputs() {
        let page = login_page(
            "/auth",
            Some("Invalid username or password."),
            Some(r#"https://app.example.com/"><script>"#),
        );

        assert!(page.contains(r#"action="/auth""#));
        assert!(page.contains("Invalid username or password."));
        assert!(page.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_login_page_without_error() {
        let page = login_page("/auth", None, None);
        assert!(!page.contains(r#"class="error""#));
        assert!(page.contains(r#"name="request_uri" type="hidden" value="""#));
    }

    #[test]
    fn test_authenticated_page() {
        let page = authenticated_page("John <Doe>", "/auth/logout");
        assert!(page.contains("John &lt;Doe&gt;"));
        assert!(page.contains(r#"href="/auth/logout""#));
    }
}
