use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::api::common::middleware::LOGIN_PATH;
use crate::api::common::utils::{escape_html, remove_auth_cookie, AUTH_COOKIE};
use crate::api::v1::analytics::{compute_analytics, summarize, Analytics};
use crate::api::common::Language;
use crate::api::v1::categories::{list_category_entries, list_stored_categories, Category, CategoryEntry};
use crate::api::v1::contact::{list_contact_messages, ContactMessage};
use crate::api::v1::login::{authenticate, decode_token, Claims};
use crate::api::v1::videos::{list_all_videos, Video};
use crate::authentication::Credentials;
use crate::embed::Platform;
use crate::errors::AppError;
use crate::pages::layout::admin_page;
use crate::pages::public::site_settings;
use crate::InnerState;

const ADMIN_SCRIPT: &str = include_str!("assets/admin.js");
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

/// Decodes the auth cookie. Anything but a valid token sends the browser back
/// to the login page.
fn require_admin(inner: &InnerState, cookies: &Cookies) -> Result<Claims, Response> {
    let token = cookies
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Redirect::to(LOGIN_PATH).into_response())?;

    decode_token(&token, &inner.config).map_err(|_| {
        remove_auth_cookie(cookies);
        Redirect::to(LOGIN_PATH).into_response()
    })
}

fn login_form(error: Option<&str>) -> Html<String> {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="pt">
<head><meta charset="utf-8"><meta name="robots" content="noindex"><title>Login Admin - Mundo Musical</title></head>
<body style="font-family:system-ui,sans-serif;background:#fff7ed;display:flex;justify-content:center;padding-top:4rem">
<form method="post" action="{login}" style="background:#fff;padding:2rem;border-radius:1rem;min-width:20rem">
<h1>🦕 Admin Login</h1>
{error}
<p><label>Email<br><input name="email" type="email" required autocomplete="username"></label></p>
<p><label>Password<br><input name="password" type="password" required autocomplete="current-password"></label></p>
<button type="submit">Entrar</button>
</form>
</body>
</html>"#,
        login = LOGIN_PATH,
        error = error,
    ))
}

pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Html<String> {
    login_form(query.error.as_deref())
}

#[tracing::instrument(name = "Admin form login", skip(inner, cookies, credentials))]
pub async fn login_submit(
    State(inner): State<InnerState>,
    cookies: Cookies,
    Form(credentials): Form<Credentials>,
) -> Result<Response, AppError> {
    match authenticate(&credentials, &inner, &cookies).await {
        Ok(_) => Ok(Redirect::to(DASHBOARD_PATH).into_response()),
        Err(AppError::Authentication(e)) => {
            tracing::warn!("Admin login rejected: {:?}", e);
            Ok((
                StatusCode::UNAUTHORIZED,
                login_form(Some("Email ou password incorretos")),
            )
                .into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn logout_submit(cookies: Cookies) -> Redirect {
    remove_auth_cookie(&cookies);
    Redirect::to(LOGIN_PATH)
}

fn render_analytics(analytics: &Analytics) -> String {
    let stats = [
        ("🎬", "Total de Vídeos", analytics.total_videos),
        ("✅", "Vídeos Ativos", analytics.active_videos),
        ("🏷️", "Categorias", analytics.total_categories),
        ("📺", "Vídeos YouTube", analytics.youtube_videos),
        ("⭐", "Em Destaque", analytics.featured_videos),
    ];
    let cards: String = stats
        .iter()
        .map(|(emoji, label, value)| {
            format!(
                r#"<div class="card"><div style="font-size:2rem">{}</div><strong>{}</strong><p>{}</p></div>"#,
                emoji, value, label
            )
        })
        .collect();

    let activity: String = if analytics.recent_activity.is_empty() {
        "<li>Sem atividade recente</li>".to_string()
    } else {
        analytics
            .recent_activity
            .iter()
            .map(|a| format!("<li>{} <small>{}</small></li>", escape_html(&a.message), a.date))
            .collect()
    };

    format!(
        r#"<div class="grid">{}</div><div class="card"><h3>Atividade Recente</h3><ul>{}</ul></div>"#,
        cards, activity
    )
}

fn language_options(selected: Language) -> String {
    [Language::Pt, Language::En]
        .iter()
        .map(|language| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                language.as_str(),
                if *language == selected { " selected" } else { "" },
                language.display_name()
            )
        })
        .collect()
}

fn platform_options(selected: Platform) -> String {
    [Platform::Youtube, Platform::Rumble]
        .iter()
        .map(|platform| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                platform.as_str(),
                if *platform == selected { " selected" } else { "" },
                platform.label()
            )
        })
        .collect()
}

/// Inline form that rewrites a stored category in place.
fn category_edit_form(category: &Category) -> String {
    format!(
        r#"<details><summary>Editar</summary>
<form data-api="/api/admin/categories/{id}" data-method="PUT">
<input name="name" value="{name}" required> <input name="emoji" value="{emoji}">
<input name="description" value="{description}">
<select name="language">{languages}</select>
<button type="submit">Guardar</button>
</form></details>"#,
        id = escape_html(&category.id),
        name = escape_html(&category.name),
        emoji = escape_html(&category.emoji),
        description = escape_html(&category.description),
        languages = language_options(category.language),
    )
}

fn render_categories(entries: &[CategoryEntry], stored: &[Category]) -> String {
    let rows: String = entries
        .iter()
        .map(|entry| {
            let actions = if entry.derived {
                "<em>dos vídeos</em>".to_string()
            } else {
                let edit = stored
                    .iter()
                    .find(|c| c.id == entry.id)
                    .map(category_edit_form)
                    .unwrap_or_default();
                format!(
                    r#"{}<button data-action="delete" data-url="/api/admin/categories/{}">Eliminar</button>"#,
                    edit,
                    escape_html(&entry.id)
                )
            };
            format!(
                "<tr><td>{} {}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                entry.emoji,
                escape_html(&entry.name),
                entry.language.display_name(),
                escape_html(&entry.description),
                entry.video_count,
                actions
            )
        })
        .collect();

    format!(
        r#"<div class="card"><h3>🏷️ Categorias</h3>
<table><tr><th>Nome</th><th>Idioma</th><th>Descrição</th><th>Vídeos</th><th></th></tr>{rows}</table>
<form data-api="/api/admin/categories">
<input name="name" placeholder="Nome" required> <input name="emoji" placeholder="Emoji (opcional)">
<input name="description" placeholder="Descrição (opcional)">
<select name="language"><option value="pt">Português</option><option value="en">English</option></select>
<button type="submit">Adicionar Categoria</button>
</form></div>"#,
        rows = rows
    )
}

fn render_messages(messages: &[ContactMessage]) -> String {
    if messages.is_empty() {
        return r#"<div class="card"><h3>📬 Mensagens</h3><p>Sem mensagens</p></div>"#.to_string();
    }
    let items: String = messages
        .iter()
        .map(|m| {
            format!(
                "<li><strong>{}</strong> &lt;{}&gt; {} <small>{}</small><p>{}</p></li>",
                escape_html(&m.name),
                escape_html(&m.email),
                m.subject.as_deref().map(escape_html).unwrap_or_default(),
                m.created_at.format("%d/%m/%Y"),
                escape_html(&m.message)
            )
        })
        .collect();
    format!(r#"<div class="card"><h3>📬 Mensagens</h3><ul>{}</ul></div>"#, items)
}

#[tracing::instrument(name = "Admin dashboard", skip(inner, cookies))]
pub async fn dashboard(State(inner): State<InnerState>, cookies: Cookies) -> Response {
    let claims = match require_admin(&inner, &cookies) {
        Ok(claims) => claims,
        Err(redirect) => return redirect,
    };

    let analytics = compute_analytics(&inner.db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to compute analytics: {}", e);
        summarize(&[])
    });
    let categories = list_category_entries(&inner.db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to load categories: {}", e);
        Vec::new()
    });
    let stored_categories = list_stored_categories(&inner.db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to load stored categories: {}", e);
        Vec::new()
    });
    let messages = list_contact_messages(&inner.db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to load contact messages: {}", e);
        Vec::new()
    });
    let settings = site_settings(&inner.db).await;

    let checked = if settings.maintenance_mode { " checked" } else { "" };
    let settings_form = format!(
        r#"<div class="card"><h3>⚙️ Configurações do Site</h3>
<form data-api="/api/admin/settings" data-method="PUT">
<p><label>Nome do site<br><input name="siteName" value="{site_name}"></label></p>
<p><label>Descrição<br><input name="siteDescription" value="{site_description}"></label></p>
<p><label>Palavras-chave<br><input name="siteKeywords" value="{site_keywords}"></label></p>
<p><label>Email de contacto<br><input name="contactEmail" value="{contact_email}"></label></p>
<p><label><input type="checkbox" name="maintenanceMode"{checked}> Modo de manutenção</label></p>
<p><label>YouTube<br><input name="socialLinks.youtube" value="{youtube}"></label></p>
<p><label>Instagram<br><input name="socialLinks.instagram" value="{instagram}"></label></p>
<p><label>Facebook<br><input name="socialLinks.facebook" value="{facebook}"></label></p>
<p><label>Meta título<br><input name="seo.metaTitle" value="{meta_title}"></label></p>
<p><label>Meta descrição<br><input name="seo.metaDescription" value="{meta_description}"></label></p>
<p><label>Imagem OG<br><input name="seo.ogImage" value="{og_image}"></label></p>
<button type="submit">Guardar</button>
</form></div>"#,
        site_name = escape_html(&settings.site_name),
        site_description = escape_html(&settings.site_description),
        site_keywords = escape_html(&settings.site_keywords),
        contact_email = escape_html(&settings.contact_email),
        checked = checked,
        youtube = escape_html(&settings.social_links.youtube),
        instagram = escape_html(&settings.social_links.instagram),
        facebook = escape_html(&settings.social_links.facebook),
        meta_title = escape_html(&settings.seo.meta_title),
        meta_description = escape_html(&settings.seo.meta_description),
        og_image = escape_html(&settings.seo.og_image),
    );

    let body = format!(
        r#"<h1>Bem-vindo ao Dashboard! 🎉</h1>
<p>Olá, {email}. Gere o conteúdo do Mundo Musical de forma simples e eficaz.</p>
{analytics}{categories}{settings_form}{messages}
<script>{script}</script>"#,
        email = escape_html(&claims.sub),
        analytics = render_analytics(&analytics),
        categories = render_categories(&categories, &stored_categories),
        settings_form = settings_form,
        messages = render_messages(&messages),
        script = ADMIN_SCRIPT,
    );

    admin_page("Dashboard", &body).into_response()
}

/// Inline form pre-filled with the stored video. Submitting replaces it.
fn video_edit_form(video: &Video, url: &str) -> String {
    format!(
        r#"<details><summary>Editar</summary>
<form data-api="{url}" data-method="PUT">
<p><input name="title" value="{title}" required></p>
<p><input name="videoId" value="{video_id}" required> <select name="platform">{platforms}</select></p>
<p><textarea name="description">{description}</textarea></p>
<p><input name="category" value="{category}" placeholder="Categoria"> <input name="duration" value="{duration}" placeholder="Duração">
<select name="language">{languages}</select>
<label><input type="checkbox" name="featured"{featured}> Destaque</label>
<label><input type="checkbox" name="isActive"{active}> Ativo</label></p>
<button type="submit">Guardar</button>
</form></details>"#,
        url = url,
        title = escape_html(&video.title),
        video_id = escape_html(&video.video_id),
        platforms = platform_options(video.platform),
        description = escape_html(&video.description),
        category = video.category.as_deref().map(escape_html).unwrap_or_default(),
        duration = video.duration.as_deref().map(escape_html).unwrap_or_default(),
        languages = language_options(video.language),
        featured = if video.featured { " checked" } else { "" },
        active = if video.is_active { " checked" } else { "" },
    )
}

fn render_video_row(video: &Video) -> String {
    let url = format!("/api/admin/videos/{}", escape_html(&video.id));
    format!(
        r#"<tr><td>{title}</td><td>{platform}</td><td>{video_id}</td><td>{category}</td><td>{language}</td><td>{date}</td>
<td><button data-action="active" data-url="{url}/active" data-value="{next_active}">{active_label}</button>
<button data-action="featured" data-url="{url}/featured" data-value="{next_featured}">{featured_label}</button>
<button data-action="delete" data-url="{url}">Eliminar</button>
{edit}</td></tr>"#,
        title = escape_html(&video.title),
        platform = video.platform.label(),
        video_id = escape_html(&video.video_id),
        category = video.category.as_deref().map(escape_html).unwrap_or_default(),
        language = video.language.as_str(),
        date = video.created_at.format("%d/%m/%Y"),
        url = url,
        next_active = !video.is_active,
        active_label = if video.is_active { "✅ Ativo" } else { "⏸️ Inativo" },
        next_featured = !video.featured,
        featured_label = if video.featured { "⭐ Destaque" } else { "☆ Destacar" },
        edit = video_edit_form(video, &url),
    )
}

#[tracing::instrument(name = "Admin videos page", skip(inner, cookies))]
pub async fn videos(State(inner): State<InnerState>, cookies: Cookies) -> Response {
    if let Err(redirect) = require_admin(&inner, &cookies) {
        return redirect;
    }

    let videos = list_all_videos(&inner.db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to load videos: {}", e);
        Vec::new()
    });
    let rows: String = videos.iter().map(render_video_row).collect();

    let body = format!(
        r#"<h1>🎬 Gestão de Vídeos</h1>
<div class="card"><h3>Adicionar Vídeo</h3>
<form data-api="/api/admin/videos">
<p><input name="title" placeholder="Título" required></p>
<p><input name="videoId" placeholder="URL do YouTube ou Rumble" required></p>
<p><textarea name="description" placeholder="Descrição"></textarea></p>
<p><input name="category" placeholder="Categoria"> <input name="duration" placeholder="Duração">
<select name="language"><option value="pt">Português</option><option value="en">English</option></select>
<label><input type="checkbox" name="featured"> Destaque</label>
<label><input type="checkbox" name="isActive" checked> Ativo</label></p>
<button type="submit">Adicionar</button>
</form></div>
<div class="card"><table>
<tr><th>Título</th><th>Plataforma</th><th>ID</th><th>Categoria</th><th>Idioma</th><th>Criado</th><th></th></tr>
{rows}
</table></div>
<script>{script}</script>"#,
        rows = rows,
        script = ADMIN_SCRIPT,
    );

    admin_page("Vídeos", &body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::categories::{insert_category, CategoryRequest};
    use crate::api::v1::videos::tests::seed;
    use crate::db::test_pool;

    #[test]
    fn login_form_escapes_error() {
        let Html(html) = login_form(Some("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"action="/admin/login""#));
    }

    #[tokio::test]
    async fn video_rows_offer_the_opposite_toggle() {
        let db = test_pool().await;
        let video = seed(&db, "Dino & amigos", "ABC123", Some("Musical"), Language::Pt).await;

        let row = render_video_row(&video);
        assert!(row.contains("Dino &amp; amigos"));
        assert!(row.contains(&format!(r#"data-url="/api/admin/videos/{}/active" data-value="false""#, video.id)));
        assert!(row.contains(r#"data-value="true">☆ Destacar"#));
    }

    #[test]
    fn derived_categories_cannot_be_deleted_from_the_table() {
        let entries = vec![CategoryEntry {
            id: "video_cat_0".to_string(),
            name: "Kids".to_string(),
            emoji: "👶".to_string(),
            description: "Categoria extraída dos vídeos (1 vídeo)".to_string(),
            language: Language::En,
            video_count: 1,
            derived: true,
            created_at: None,
        }];
        let html = render_categories(&entries, &[]);
        assert!(html.contains("dos vídeos"));
        assert!(!html.contains("/api/admin/categories/video_cat_0"));
    }

    #[tokio::test]
    async fn video_rows_carry_a_prefilled_edit_form() {
        let db = test_pool().await;
        let video = seed(&db, "Dino dança", "https://rumble.com/v4xyz-dino.html", Some("Dança"), Language::En).await;

        let row = render_video_row(&video);
        assert!(row.contains(&format!(
            r#"<form data-api="/api/admin/videos/{}" data-method="PUT">"#,
            video.id
        )));
        assert!(row.contains(r#"name="title" value="Dino dança""#));
        assert!(row.contains(r#"name="videoId" value="v4xyz""#));
        assert!(row.contains(r#"<option value="rumble" selected>"#));
        assert!(row.contains(r#"<option value="en" selected>"#));
        assert!(row.contains(r#"name="isActive" checked"#));
    }

    #[tokio::test]
    async fn stored_categories_are_edited_with_their_raw_description() {
        let db = test_pool().await;
        let request = CategoryRequest {
            name: "Musical".to_string(),
            emoji: Some("🎵".to_string()),
            description: Some("Canções".to_string()),
            language: Language::Pt,
        };
        let category = insert_category(&db, request).await.unwrap();
        seed(&db, "Dino canta", "ABC123", Some("Musical"), Language::Pt).await;

        let entries = list_category_entries(&db).await.unwrap();
        let stored = list_stored_categories(&db).await.unwrap();
        let html = render_categories(&entries, &stored);

        assert!(html.contains(&format!(
            r#"<form data-api="/api/admin/categories/{}" data-method="PUT">"#,
            category.id
        )));
        assert!(html.contains(r#"name="description" value="Canções""#));
        assert!(html.contains("Canções (1 vídeo)"));
    }
}
