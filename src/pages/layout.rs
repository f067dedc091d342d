use axum::response::Html;

use crate::api::common::utils::escape_html;
use crate::api::v1::settings::SiteSettings;

const NAV_LINKS: &[(&str, &str)] = &[
    ("/", "Início"),
    ("/videos", "Vídeos"),
    ("/sobre", "Sobre"),
    ("/em-breve", "Em Breve"),
    ("/contacto", "Contacto"),
];

const STYLES: &str = r#"
body{margin:0;font-family:system-ui,sans-serif;background:#fff7ed;color:#1f2937}
header,footer{background:#fff;padding:1rem 2rem;box-shadow:0 1px 4px rgba(0,0,0,.08)}
nav a{margin-right:1rem;color:#ea580c;text-decoration:none;font-weight:600}
main{max-width:72rem;margin:0 auto;padding:2rem}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(18rem,1fr));gap:1.5rem}
.card{background:#fff;border-radius:1rem;padding:1rem;box-shadow:0 2px 8px rgba(0,0,0,.06)}
.video-frame{position:relative;padding-top:56.25%}
.video-frame iframe{position:absolute;inset:0;width:100%;height:100%;border:0}
.tag{display:inline-block;background:#ffedd5;border-radius:999px;padding:.1rem .6rem;margin-right:.3rem;font-size:.85rem}
.error{color:#b91c1c}
table{width:100%;border-collapse:collapse}td,th{padding:.4rem;border-bottom:1px solid #eee;text-align:left}
"#;

/// Public page shell: navigation, footer and the service worker registration.
pub fn page(settings: &SiteSettings, title: &str, body: &str) -> Html<String> {
    let nav: String = NAV_LINKS
        .iter()
        .map(|(href, label)| format!(r#"<a href="{}">{}</a>"#, href, label))
        .collect();

    let social: String = [
        ("YouTube", &settings.social_links.youtube),
        ("Instagram", &settings.social_links.instagram),
        ("Facebook", &settings.social_links.facebook),
    ]
    .iter()
    .filter(|(_, url)| !url.is_empty())
    .map(|(name, url)| format!(r#" <a href="{}">{}</a>"#, escape_html(url), name))
    .collect();

    let full_title = if title.is_empty() {
        settings.seo.meta_title.clone()
    } else {
        format!("{} - {}", title, settings.site_name)
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="pt">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<meta name="description" content="{description}">
<meta name="keywords" content="{keywords}">
<meta property="og:title" content="{og_title}">
<meta property="og:description" content="{description}">
<meta property="og:image" content="{og_image}">
<meta property="og:type" content="website">
<link rel="manifest" href="/manifest.json">
<style>{styles}</style>
</head>
<body>
<header><strong>🦕 {site_name}</strong> <nav>{nav}</nav></header>
<main>{body}</main>
<footer>
<p>{site_description}</p>
<p>📧 <a href="mailto:{contact_email}">{contact_email}</a>{social}</p>
</footer>
<script>
if ('serviceWorker' in navigator) {{
  window.addEventListener('load', () => navigator.serviceWorker.register('/sw.js'));
}}
</script>
</body>
</html>"#,
        title = escape_html(&full_title),
        description = escape_html(&settings.seo.meta_description),
        keywords = escape_html(&settings.site_keywords),
        og_title = escape_html(&settings.seo.meta_title),
        og_image = escape_html(&settings.seo.og_image),
        styles = STYLES,
        site_name = escape_html(&settings.site_name),
        nav = nav,
        body = body,
        site_description = escape_html(&settings.site_description),
        contact_email = escape_html(&settings.contact_email),
        social = social,
    ))
}

/// Bare shell for the admin area.
pub fn admin_page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="pt">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>{title} - Admin</title>
<style>{styles}</style>
</head>
<body>
<header><strong>🦕 Admin</strong> <nav><a href="/admin/dashboard">Dashboard</a><a href="/admin/videos">Vídeos</a><a href="/">Ver site</a></nav>
<form method="post" action="/admin/logout" style="display:inline"><button type="submit">Sair</button></form></header>
<main>{body}</main>
</body>
</html>"#,
        title = escape_html(title),
        styles = STYLES,
        body = body,
    ))
}
