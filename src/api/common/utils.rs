use cookie::{Cookie, SameSite};
use time::OffsetDateTime;
use tower_cookies::Cookies;

use crate::config::Config;
use crate::errors::AppError;

pub const AUTH_COOKIE: &str = "auth-token";

pub fn setup_auth_cookie(token: &str, config: &Config, cookies: &Cookies) {
    let mut cookie = Cookie::new(AUTH_COOKIE, token.to_string());

    if config.is_development() {
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(false);
    } else {
        if let Some(domain) = &config.cookie_domain {
            let cookie_domain = if domain.starts_with('.') {
                domain.to_string()
            } else {
                format!(".{}", domain)
            };
            cookie.set_domain(cookie_domain);
        }
        cookie.set_same_site(SameSite::Strict);
        cookie.set_secure(true);
    }

    let mut expires = OffsetDateTime::now_utc();
    expires += time::Duration::days(7);

    cookie.set_path("/");
    cookie.set_expires(expires);
    cookie.set_http_only(true);
    cookies.add(cookie);
}

pub fn remove_auth_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::build(AUTH_COOKIE).path("/").build();
    cookie.make_removal();
    cookies.remove(cookie);
}

pub async fn timeout_query<T, F>(duration: std::time::Duration, fut: F) -> Result<T, AppError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(AppError::from(e)),
        Err(elapsed) => {
            tracing::error!("Query timeout after {:?}", duration);
            Err(AppError::Timeout(elapsed))
        }
    }
}

pub const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Escapes text for safe interpolation into HTML bodies and attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Dino & 'Família'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Dino &amp; &#39;Família&#39;&lt;/a&gt;"
        );
    }

    #[tokio::test]
    async fn timeout_query_maps_elapsed_to_timeout() {
        let result: Result<(), AppError> = timeout_query(std::time::Duration::from_millis(5), async {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }
}
