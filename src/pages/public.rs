use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::api::common::utils::escape_html;
use crate::api::common::Language;
use crate::api::v1::categories::guess_emoji;
use crate::api::v1::contact::CONTACT_SUBJECTS;
use crate::api::v1::settings::{load_settings, SiteSettings};
use crate::api::v1::videos::{active_video_categories, list_active_videos, PublicVideo, VideoFilter};
use crate::embed::Platform;
use crate::pages::layout::page;
use crate::InnerState;

const PLAYER_SCRIPT: &str = include_str!("assets/player.js");
const HOME_PREVIEW_COUNT: u32 = 3;

#[derive(Debug, Clone, Copy)]
enum CardStatus {
    Available,
    ComingSoon,
    InDevelopment,
}

impl CardStatus {
    fn label(self) -> &'static str {
        match self {
            CardStatus::Available => "Disponível",
            CardStatus::ComingSoon => "Em Breve",
            CardStatus::InDevelopment => "Em Desenvolvimento",
        }
    }
}

struct Card {
    emoji: &'static str,
    title: &'static str,
    description: &'static str,
    status: CardStatus,
    link: Option<&'static str>,
    action: &'static str,
}

const HOME_CARDS: &[Card] = &[
    Card {
        emoji: "🎬",
        title: "Vídeos Educativos",
        description: "Explora a nossa coleção de vídeos musicais educativos. Aprende enquanto te diverte com o Dino!",
        status: CardStatus::Available,
        link: Some("/videos"),
        action: "Ver Vídeos",
    },
    Card {
        emoji: "🎨",
        title: "Livros para Colorir",
        description: "Em breve terás acesso a livros para colorir digitais e para imprimir com o Dino e os seus amigos!",
        status: CardStatus::ComingSoon,
        link: Some("/em-breve"),
        action: "Ver Mais",
    },
    Card {
        emoji: "📱",
        title: "App Dino TV",
        description: "A aplicação móvel está a caminho! Vai ter jogos, vídeos e atividades interativas para toda a família.",
        status: CardStatus::InDevelopment,
        link: Some("/em-breve"),
        action: "Saber Mais",
    },
    Card {
        emoji: "🧸",
        title: "Peluches e Brinquedos",
        description: "Vai poder abraçar o Dino! Peluches macios e brinquedos educativos estão a ser preparados.",
        status: CardStatus::ComingSoon,
        link: Some("/em-breve"),
        action: "Ver Mais",
    },
    Card {
        emoji: "🎵",
        title: "Música e Karaoke",
        description: "Canta as músicas favoritas do Dino! Sistema de karaoke interativo para crianças.",
        status: CardStatus::InDevelopment,
        link: Some("/em-breve"),
        action: "Em Breve",
    },
    Card {
        emoji: "👥",
        title: "Dino Club",
        description: "Junta-te à comunidade oficial! Recebe novidades, atividades exclusivas e surpresas especiais.",
        status: CardStatus::Available,
        link: Some("/contacto"),
        action: "Juntar-me",
    },
];

const UPCOMING_CARDS: &[Card] = &[
    Card {
        emoji: "🎨",
        title: "Livros para Colorir Digitais",
        description: "Livros interativos para colorir no tablet ou computador, com o Dino e todos os seus amigos!",
        status: CardStatus::ComingSoon,
        link: None,
        action: "Em Breve",
    },
    Card {
        emoji: "📱",
        title: "App Dino TV",
        description: "A aplicação oficial do Dino! Vídeos, jogos educativos, karaoke e atividades interativas.",
        status: CardStatus::InDevelopment,
        link: None,
        action: "A Caminho",
    },
    Card {
        emoji: "🧸",
        title: "Peluche do Dino",
        description: "O Dino ganha vida! Peluche super macio e fofo para abraçar.",
        status: CardStatus::ComingSoon,
        link: None,
        action: "Em Breve",
    },
    Card {
        emoji: "🎮",
        title: "Jogos Educativos Online",
        description: "Quebra-cabeças, memória, pintura e muito mais para aprender brincando.",
        status: CardStatus::InDevelopment,
        link: None,
        action: "A Caminho",
    },
    Card {
        emoji: "🎵",
        title: "Álbum Musical do Dino",
        description: "Todas as músicas favoritas do Dino num álbum completo!",
        status: CardStatus::InDevelopment,
        link: None,
        action: "A Caminho",
    },
    Card {
        emoji: "👕",
        title: "Roupa e Acessórios",
        description: "T-shirts, gorros, mochilas e outros acessórios com o Dino.",
        status: CardStatus::ComingSoon,
        link: None,
        action: "Em Breve",
    },
];

const FAQ: &[(&str, &str)] = &[
    (
        "Quando chegam as novidades?",
        "Estamos a trabalhar constantemente em novos produtos! Segue-nos para atualizações em tempo real.",
    ),
    (
        "Os produtos serão gratuitos?",
        "Muitos conteúdos digitais serão gratuitos. Alguns produtos físicos terão custo.",
    ),
    (
        "Como posso ajudar ou dar sugestões?",
        "Envia-nos uma mensagem através da página de contacto. Adoramos ouvir as ideias das famílias!",
    ),
];

#[derive(Debug, Default, Deserialize)]
pub struct VideosPageQuery {
    pub category: Option<String>,
}

/// Settings for rendering; a read failure falls back to the defaults.
pub(crate) async fn site_settings(db: &SqlitePool) -> SiteSettings {
    load_settings(db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to load site settings: {}", e);
        SiteSettings::default()
    })
}

/// Active YouTube videos, newest first. A read failure renders as no videos.
async fn youtube_videos(db: &SqlitePool, filter: VideoFilter) -> Vec<PublicVideo> {
    let filter = VideoFilter {
        platform: Some(Platform::Youtube),
        ..filter
    };
    match list_active_videos(db, &filter).await {
        Ok(videos) => videos.into_iter().map(PublicVideo::from).collect(),
        Err(e) => {
            tracing::error!("Failed to load videos: {}", e);
            Vec::new()
        }
    }
}

fn render_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|card| {
            let action = match card.link {
                Some(link) => format!(r#"<a href="{}">{}</a>"#, link, card.action),
                None => format!(r#"<span aria-disabled="true">{}</span>"#, card.action),
            };
            format!(
                r#"<div class="card"><div style="font-size:2.5rem">{}</div><h3>{}</h3><span class="tag">{}</span><p>{}</p>{}</div>"#,
                card.emoji,
                card.title,
                card.status.label(),
                card.description,
                action
            )
        })
        .collect()
}

fn render_video_card(video: &PublicVideo) -> String {
    let Some(embed) = &video.embed_url else {
        return String::new();
    };
    let v = &video.video;

    let featured = if v.featured {
        r#"<span class="tag">⭐ Destaque</span>"#
    } else {
        ""
    };
    let category = v
        .category
        .as_deref()
        .map(|c| format!(r#"<span class="tag">🏷️ {}</span>"#, escape_html(c)))
        .unwrap_or_default();

    format!(
        r#"<div class="card">
<div class="video-frame"><iframe id="player-{id}" data-player data-video-id="{video_id}" src="{embed}" title="{title}" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share" allowfullscreen></iframe></div>
<p><span class="tag">📺 {platform}</span>{featured}</p>
<h3>{title}</h3>
<p>{description}</p>
<p>{category}<span class="tag">{date}</span></p>
</div>"#,
        id = escape_html(&v.id),
        video_id = escape_html(&v.video_id),
        embed = escape_html(embed),
        title = escape_html(&v.title),
        platform = v.platform.label(),
        featured = featured,
        description = escape_html(&v.description),
        category = category,
        date = v.created_at.format("%d/%m/%Y"),
    )
}

fn render_video_grid(videos: &[PublicVideo], category: Option<&str>) -> String {
    if videos.is_empty() {
        let detail = match category {
            Some(c) => format!("Não há vídeos na categoria \"{}\"", escape_html(c)),
            None => "Ainda não há vídeos disponíveis".to_string(),
        };
        return format!(
            r#"<div class="card" style="text-align:center"><div style="font-size:3rem">🎬</div><h3>Nenhum vídeo encontrado</h3><p>{}</p></div>"#,
            detail
        );
    }

    let cards: String = videos.iter().map(render_video_card).collect();
    format!(
        r#"<div class="grid">{}</div><script>{}</script>"#,
        cards, PLAYER_SCRIPT
    )
}

#[tracing::instrument(name = "Home page", skip(inner))]
pub async fn home(State(inner): State<InnerState>) -> Html<String> {
    let settings = site_settings(&inner.db).await;
    let preview = youtube_videos(
        &inner.db,
        VideoFilter {
            language: Some(Language::Pt),
            limit: Some(HOME_PREVIEW_COUNT),
            ..Default::default()
        },
    )
    .await;

    let body = format!(
        r#"<section style="text-align:center">
<img src="/images/dino&amp;family/dino_cp.png" alt="Mundo Musical" width="200" height="200">
<h1>O Dino está a conquistar os miúdos... e os pais também!</h1>
<p>Descobre um mundo mágico de música, aprendizagem e diversão. Vídeos educativos que inspiram e entretêm toda a família!</p>
<p><a href="/videos">🎬 Ver Vídeos</a> <a href="/em-breve">🎨 Colorir com o Dino (em breve)</a></p>
</section>
<section><h2>O que podes encontrar no mundo do Dino</h2><div class="grid">{cards}</div></section>
<section><h2>Os vídeos mais recentes</h2>{videos}<p><a href="/videos">Ver todos os vídeos</a></p></section>"#,
        cards = render_cards(HOME_CARDS),
        videos = render_video_grid(&preview, None),
    );

    page(&settings, "", &body)
}

pub async fn about(State(inner): State<InnerState>) -> Html<String> {
    let settings = site_settings(&inner.db).await;
    let body = r#"<h1>A História do Dino</h1>
<p>Descobre como tudo começou e qual é a nossa missão</p>
<div class="card"><h2>🌟 Como tudo começou</h2>
<p>Era uma vez um dinossauro muito especial chamado Dino, que vivia num mundo colorido e cheio de música. Ao contrário dos outros dinossauros que rugiam, o Dino preferia cantar e fazer música!</p>
<p>O Dino descobriu que através da música podia ensinar coisas incríveis às crianças: desde as cores do arco-íris até aos números, desde as letras do alfabeto até aos valores mais importantes da vida.</p>
<p>Assim nasceu o <strong>Mundo Musical</strong>, um lugar mágico onde a aprendizagem e a diversão andam de mãos dadas.</p></div>
<div class="grid">
<div class="card"><h3>🎯 A Nossa Missão</h3><p>Criar conteúdo educativo de qualidade que inspire, eduque e divirta crianças de todas as idades.</p></div>
<div class="card"><h3>💝 Os Nossos Valores</h3><p>Criatividade, diversão, aprendizagem e família.</p></div>
</div>
<div class="card"><h3>Quer fazer parte da família Dino? 🦕</h3><p>Junta-te ao Dino Club e fica a par de todas as novidades!</p><a href="/contacto">Juntar ao Dino Club</a></div>"#;

    page(&settings, "Sobre o Dino", body)
}

pub async fn contact(State(inner): State<InnerState>) -> Html<String> {
    let settings = site_settings(&inner.db).await;
    let subjects: String = CONTACT_SUBJECTS
        .iter()
        .map(|(value, label)| format!(r#"<option value="{}">{}</option>"#, value, label))
        .collect();

    let body = format!(
        r#"<h1>📞 Contacto</h1>
<p>Tens alguma dúvida ou sugestão? Escreve-nos para <a href="mailto:{email}">{email}</a>.</p>
<div class="grid">
<form class="card" data-endpoint="/api/contact">
<h2>Envia-nos uma mensagem</h2>
<p><label>Nome *<br><input name="name" required></label></p>
<p><label>Email *<br><input name="email" type="email" required></label></p>
<p><label>Assunto<br><select name="subject"><option value="">Escolhe um assunto</option>{subjects}</select></label></p>
<p><label>Mensagem *<br><textarea name="message" rows="5" required></textarea></label></p>
<button type="submit">Enviar Mensagem</button><p class="status"></p>
</form>
<form class="card" data-endpoint="/api/newsletter">
<h2>👥 Dino Club</h2>
<p><label>Nome *<br><input name="name" required></label></p>
<p><label>Email *<br><input name="email" type="email" required></label></p>
<button type="submit">Juntar ao Dino Club</button><p class="status"></p>
</form>
</div>
<script>
document.querySelectorAll('form[data-endpoint]').forEach((form) => {{
  form.addEventListener('submit', async (event) => {{
    event.preventDefault();
    const status = form.querySelector('.status');
    const body = Object.fromEntries(new FormData(form).entries());
    if (body.subject === '') delete body.subject;
    const response = await fetch(form.dataset.endpoint, {{
      method: 'POST',
      headers: {{ 'Content-Type': 'application/json' }},
      body: JSON.stringify(body)
    }});
    const result = await response.json().catch(() => ({{}}));
    status.className = response.ok ? 'status' : 'status error';
    status.textContent = result.message || (response.ok ? 'Obrigado!' : 'Ocorreu um erro. Tenta novamente mais tarde.');
    if (response.ok) form.reset();
  }});
}});
</script>"#,
        email = escape_html(&settings.contact_email),
        subjects = subjects,
    );

    page(&settings, "Contacto", &body)
}

#[tracing::instrument(name = "Videos page", skip(inner))]
pub async fn videos(
    State(inner): State<InnerState>,
    Query(query): Query<VideosPageQuery>,
) -> Html<String> {
    let settings = site_settings(&inner.db).await;
    let category = query.category.filter(|c| !c.trim().is_empty());

    let categories = active_video_categories(&inner.db).await.unwrap_or_else(|e| {
        tracing::error!("Failed to load video categories: {}", e);
        Vec::new()
    });
    let videos = youtube_videos(
        &inner.db,
        VideoFilter {
            category: category.clone(),
            ..Default::default()
        },
    )
    .await;

    let mut filters = String::from(r#"<a class="tag" href="/videos">🎬 Todos os Vídeos</a>"#);
    for name in &categories {
        filters.push_str(&format!(
            r#"<a class="tag" href="/videos?category={}">{} {}</a>"#,
            escape_html(&url::form_urlencoded::byte_serialize(name.as_bytes()).collect::<String>()),
            guess_emoji(name),
            escape_html(name)
        ));
    }

    let body = format!(
        r#"<h1>🎬 Vídeos do Dino</h1>
<p>Descobre todos os vídeos educativos e divertidos do Dino! Música, aprendizagem e diversão num só lugar.</p>
<div class="card">{filters}</div>
{grid}"#,
        filters = filters,
        grid = render_video_grid(&videos, category.as_deref()),
    );

    page(&settings, "Vídeos", &body)
}

pub async fn coming_soon(State(inner): State<InnerState>) -> Html<String> {
    let settings = site_settings(&inner.db).await;

    let maintenance = if settings.maintenance_mode {
        r#"<div class="card"><h2>🔧 Estamos a preparar novidades</h2><p>O site está em manutenção. Volta em breve!</p></div>"#
    } else {
        ""
    };
    let faq: String = FAQ
        .iter()
        .map(|(question, answer)| format!("<h3>{}</h3><p>{}</p>", question, answer))
        .collect();

    let body = format!(
        r#"{maintenance}<h1>Novidades a Caminho!</h1>
<p>O mundo do Dino está sempre a crescer! Descobre todas as coisas incríveis que estamos a preparar para ti.</p>
<div class="grid">{cards}</div>
<div class="card"><h2>Quer ser o primeiro a saber?</h2><p>Junta-te ao Dino Club e recebe todas as novidades em primeira mão!</p><a href="/contacto">🎉 Juntar ao Dino Club</a></div>
<div class="card"><h2>❓ Perguntas Frequentes</h2>{faq}</div>"#,
        maintenance = maintenance,
        cards = render_cards(UPCOMING_CARDS),
        faq = faq,
    );

    page(&settings, "Em Breve", &body)
}
