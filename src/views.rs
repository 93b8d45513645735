//! Minimal server-rendered pages.

use crate::models::user::UserWithProfile;

/// Escapes text for inclusion in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

/// The sign-in / sign-up page.
pub fn login_page(redirect_to: &str) -> String {
    let redirect_to = escape(redirect_to);
    let body = format!(
        r#"<h1>Sign in to your account</h1>
<form method="post" action="/login">
  <input type="hidden" name="redirectTo" value="{redirect_to}">
  <label>Email <input type="email" name="email"></label>
  <label>Password <input type="password" name="password"></label>
  <button type="submit" name="_action" value="login">Sign in</button>
</form>
<h2>Create a new account</h2>
<form method="post" action="/login">
  <input type="hidden" name="redirectTo" value="{redirect_to}">
  <label>Email <input type="email" name="email"></label>
  <label>Password <input type="password" name="password"></label>
  <label>First Name <input type="text" name="firstName"></label>
  <label>Last Name <input type="text" name="lastName"></label>
  <button type="submit" name="_action" value="signup">Sign up</button>
</form>"#
    );
    layout("Login", &body)
}

/// The protected home page.
pub fn home_page(user: &UserWithProfile) -> String {
    let body = format!(
        r#"<h1>Home Page</h1>
<p>Welcome, {}!</p>
<form action="/logout" method="post">
  <button type="submit">Sign out</button>
</form>"#,
        escape(&user.display_name())
    );
    layout("Home", &body)
}
