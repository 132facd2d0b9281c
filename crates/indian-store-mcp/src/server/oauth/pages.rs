//! HTML pages for the browser login flow.

/// Render the login page for a login challenge.
///
/// All parameters are HTML-escaped to prevent XSS.
pub fn login_page(login_challenge: &str, error_message: Option<&str>) -> String {
    let error_html = error_message
        .map(|msg| format!(r#"<div class="error">{}</div>"#, html_escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Indian Store MCP - Login</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }}
.card {{ background: #fff; border-radius: 10px; box-shadow: 0 10px 40px rgba(0,0,0,0.2); padding: 40px; max-width: 400px; width: 100%; }}
h1 {{ font-size: 24px; margin: 0 0 10px; color: #333; }}
.subtitle {{ color: #666; font-size: 14px; margin: 0 0 30px; }}
label {{ display: block; font-size: 14px; font-weight: 500; margin-bottom: 5px; color: #555; }}
input[type="email"], input[type="password"] {{ width: 100%; padding: 12px; border: 2px solid #e0e0e0; border-radius: 5px; font-size: 14px; box-sizing: border-box; margin-bottom: 20px; }}
input:focus {{ outline: none; border-color: #667eea; }}
button {{ width: 100%; padding: 12px; background: #667eea; color: #fff; border: none; border-radius: 5px; font-size: 16px; font-weight: 600; cursor: pointer; }}
button:hover {{ background: #5568d3; }}
.error {{ background: #fee; border: 1px solid #fcc; color: #c00; padding: 12px; border-radius: 5px; margin-bottom: 20px; font-size: 14px; }}
.info {{ background: #e3f2fd; border: 1px solid #90caf9; color: #1976d2; padding: 12px; border-radius: 5px; margin-top: 20px; font-size: 12px; }}
</style>
</head>
<body>
<div class="card">
<h1>Indian Store MCP</h1>
<p class="subtitle">Sign in to authorize access</p>
{error_html}
<form method="POST" action="/login?login_challenge={challenge_query}">
<input type="hidden" name="login_challenge" value="{challenge_escaped}">
<label for="email">Email</label>
<input type="email" id="email" name="email" required autofocus>
<label for="password">Password</label>
<input type="password" id="password" name="password" required>
<button type="submit">Sign In</button>
</form>
<div class="info"><strong>Demo credentials:</strong><br>Email: admin@indian-store.com<br>Password: admin123</div>
</div>
</body>
</html>"#,
        error_html = error_html,
        challenge_query = html_escape(&urlencoding::encode(login_challenge)),
        challenge_escaped = html_escape(login_challenge),
    )
}

/// Render an OAuth error page.
pub fn error_page(error: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>OAuth Error</title>
<style>
body {{ font-family: Arial, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
.error {{ background: #fee; border: 1px solid #fcc; padding: 20px; border-radius: 5px; }}
h1 {{ color: #c00; }}
</style>
</head>
<body>
<div class="error">
<h1>OAuth Error</h1>
<p><strong>Error:</strong> {error}</p>
<p><strong>Description:</strong> {description}</p>
<p><a href="/">Return to home</a></p>
</div>
</body>
</html>"#,
        error = html_escape(error),
        description = html_escape(description),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
