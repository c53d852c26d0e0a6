use actix_web::{
    http::header::{self, ContentType},
    web, HttpResponse, HttpResponseBuilder,
};
use anyhow::Context;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use itertools::Itertools;
use log::{error, info};
use serde::Deserialize;

use crate::{
    fetch::PageFetcher,
    pipeline::TabFinder,
    search::SearchProvider,
    song::{Slug, SongRequest},
    songsterr::{self, SongsterrClient},
};

pub struct AppState<S, F> {
    pub finder: TabFinder<S, F>,
    pub songsterr: SongsterrClient,
    pub recommended_searches: Vec<String>,
}

pub fn routes<S, F>(cfg: &mut web::ServiceConfig)
where
    S: SearchProvider + 'static,
    F: PageFetcher + 'static,
{
    cfg.route("/", web::get().to(index::<S, F>))
        .route("/fetch", web::post().to(fetch::<S, F>))
        .route("/remove", web::post().to(remove::<S, F>))
        .route("/songsterr", web::get().to(songsterr_search::<S, F>))
        .route("/songsterr/embed", web::get().to(songsterr_embed));
}

#[derive(Deserialize)]
struct IndexQuery {
    song: Option<String>,
}

async fn index<S, F>(state: web::Data<AppState<S, F>>, query: web::Query<IndexQuery>) -> HttpResponse
where
    S: SearchProvider,
    F: PageFetcher,
{
    match render_index(state.get_ref(), query.into_inner().song) {
        Ok(html) => html_page(HttpResponse::Ok(), "Tab Viewer", &html),
        Err(e) => {
            error!("{e:#}");
            message_page(HttpResponse::InternalServerError(), "Could not read the tab cache.")
        }
    }
}

fn render_index<S, F>(state: &AppState<S, F>, selected: Option<String>) -> anyhow::Result<String>
where
    S: SearchProvider,
    F: PageFetcher,
{
    let cache = state.finder.cache();
    let songs = cache.list_songs().context("While listing cached tabs")?;
    let fetch_form = render_fetch_form(&state.recommended_searches);
    // `song` is either a title typed by the user or a slug from the song list;
    // `from_title` maps both to the same slug.
    let (slug, heading) = match selected.filter(|s| !s.trim().is_empty()) {
        Some(song) => (Slug::from_title(&song), song),
        None => match songs.first() {
            Some(latest) => (latest.slug.clone(), latest.name.clone()),
            None => {
                return Ok(format!(
                    "    <h2 class=\"error\">No tabs found.</h2>\n{fetch_form}"
                ))
            }
        },
    };
    let heading = songs
        .iter()
        .find(|song| song.slug == slug)
        .map_or(heading, |song| song.name.clone());
    let tab_text = cache.read_tab(&slug).context("While reading the tab")?;
    let video = match cache.read_video(&slug).context("While reading the video link")? {
        Some(url) => format!(
            r#"    <iframe src="{}" allowfullscreen></iframe>"#,
            attr(url.as_str())
        ),
        None => String::new(),
    };
    let song_options = songs
        .iter()
        .map(|song| {
            format!(
                r#"        <option value="{}"{}>{}</option>"#,
                attr(song.slug.as_str()),
                if song.slug == slug { " selected" } else { "" },
                text(&song.name),
            )
        })
        .join("\n");
    Ok(format!(
        include_str!("templates/tab_viewer_template.html"),
        song_options = song_options,
        fetch_form = fetch_form,
        song = text(&heading),
        slug = attr(slug.as_str()),
        tab_text = text(&tab_text.to_string()),
        video = video,
    ))
}

fn render_fetch_form(recommended_searches: &[String]) -> String {
    let recommended = recommended_searches
        .iter()
        .map(|item| format!(r#"        <option value="{}">{}</option>"#, attr(item), text(item)))
        .join("\n");
    format!(
        include_str!("templates/fetch_form_template.html"),
        recommended = recommended
    )
}

#[derive(Deserialize)]
struct FetchForm {
    song: String,
    #[serde(default)]
    artist: String,
}

async fn fetch<S, F>(state: web::Data<AppState<S, F>>, form: web::Form<FetchForm>) -> HttpResponse
where
    S: SearchProvider,
    F: PageFetcher,
{
    let FetchForm { song, artist } = form.into_inner();
    let song = SongRequest::new(song, Some(artist));
    if song.slug().as_str().is_empty() {
        return message_page(HttpResponse::BadRequest(), "Please enter a song title.");
    }
    match state.finder.lookup(&song).await {
        Ok(report) if report.found() => {
            info!("Lookup for {:?} finished: {report:?}", song.title());
            redirect(&format!("/?song={}", urlencoding::encode(&song.display_title())))
        }
        Ok(_) => message_page(HttpResponse::NotFound(), "❌ Could not find tab."),
        Err(e) if e.is_transient() => {
            error!("Lookup for {:?} failed: {e}", song.title());
            message_page(
                HttpResponse::BadGateway(),
                "Could not reach the tab provider. Try again.",
            )
        }
        Err(e) => {
            error!("Lookup for {:?} failed: {e}", song.title());
            message_page(
                HttpResponse::InternalServerError(),
                "Something went wrong while fetching the tab.",
            )
        }
    }
}

#[derive(Deserialize)]
struct RemoveForm {
    song: String,
}

async fn remove<S, F>(state: web::Data<AppState<S, F>>, form: web::Form<RemoveForm>) -> HttpResponse
where
    S: SearchProvider,
    F: PageFetcher,
{
    let slug = Slug::from_title(&form.song);
    match state.finder.cache().remove(&slug) {
        Ok(_) => redirect("/"),
        Err(e) => {
            error!("Failed to remove {slug:?}: {e}");
            message_page(HttpResponse::InternalServerError(), "Could not remove the tab.")
        }
    }
}

#[derive(Deserialize)]
struct SongsterrQuery {
    query: Option<String>,
}

async fn songsterr_search<S, F>(
    state: web::Data<AppState<S, F>>,
    query: web::Query<SongsterrQuery>,
) -> HttpResponse {
    let query = query.into_inner().query.unwrap_or_default();
    let result = if query.trim().is_empty() {
        String::new()
    } else {
        match state.songsterr.find(&query).await {
            Ok(Some(song)) => format!(
                "    <h3>Showing results for: {} by {}</h3>\n    <iframe src=\"{}\" allowfullscreen></iframe>",
                text(&song.title),
                text(&song.artist.name),
                attr(song.embed_url().as_str()),
            ),
            Ok(None) => error_paragraph("No tab found for that song."),
            Err(e) => {
                error!("Songsterr search for {query:?} failed: {e}");
                error_paragraph(&format!("Error searching Songsterr: {e}"))
            }
        }
    };
    let body = format!(
        include_str!("templates/songsterr_template.html"),
        query = attr(&query),
        result = result,
    );
    html_page(HttpResponse::Ok(), "Auto-Find Guitar Tabs", &body)
}

#[derive(Deserialize)]
struct EmbedQuery {
    artist: Option<String>,
    title: Option<String>,
    id: Option<String>,
}

async fn songsterr_embed(query: web::Query<EmbedQuery>) -> HttpResponse {
    let EmbedQuery { artist, title, id } = query.into_inner();
    let (artist, title, id) = (
        artist.unwrap_or_default(),
        title.unwrap_or_default(),
        id.unwrap_or_default(),
    );
    let result = if [&artist, &title, &id].iter().any(|s| s.trim().is_empty()) {
        String::new()
    } else {
        match id.trim().parse::<u64>() {
            Ok(id) => format!(
                "    <iframe src=\"{}\" allowfullscreen></iframe>",
                attr(songsterr::embed_url(&artist, &title, id).as_str())
            ),
            Err(_) => error_paragraph("Song ID must be a number."),
        }
    };
    let body = format!(
        include_str!("templates/songsterr_embed_template.html"),
        artist = attr(&artist),
        title = attr(&title),
        id = attr(&id),
        result = result,
    );
    html_page(HttpResponse::Ok(), "Guitar Tab Viewer", &body)
}

fn error_paragraph(message: &str) -> String {
    format!(r#"    <p class="error">{}</p>"#, text(message))
}

fn html_page(mut builder: HttpResponseBuilder, title: &str, body: &str) -> HttpResponse {
    builder.content_type(ContentType::html()).body(format!(
        include_str!("templates/page_template.html"),
        title = text(title),
        body = body,
    ))
}

fn message_page(builder: HttpResponseBuilder, message: &str) -> HttpResponse {
    let body = format!(
        "    <h3 class=\"error\">{}</h3>\n    <p><a href=\"/\">Back to the tab viewer</a></p>",
        text(message)
    );
    html_page(builder, "Tab Viewer", &body)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{
        body::MessageBody,
        dev::ServiceResponse,
        http::{header, StatusCode},
        test, web, App,
    };

    use scraper::Html;
    use tab_finder_utils::selector;

    use super::{routes, AppState};
    use crate::{
        config::DEFAULT_USER_AGENT,
        song::Slug,
        songsterr::SongsterrClient,
        testing::{stub_finder, StubFetcher, StubSearch},
    };

    type State = web::Data<AppState<StubSearch, StubFetcher>>;

    fn state(root: &std::path::Path, search: StubSearch, fetcher: StubFetcher) -> State {
        web::Data::new(AppState {
            finder: stub_finder(root, search, fetcher),
            songsterr: SongsterrClient::new(DEFAULT_USER_AGENT, Duration::from_secs(1)).unwrap(),
            recommended_searches: vec!["Wonderwall - Oasis".to_owned()],
        })
    }

    async fn body_of(response: ServiceResponse<impl MessageBody>) -> String {
        String::from_utf8(test::read_body(response).await.to_vec()).unwrap()
    }

    fn fetch_request(song: &str, artist: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/fetch")
            .set_form([("song", song), ("artist", artist)])
    }

    #[actix_web::test]
    async fn empty_cache_still_offers_the_form() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), StubSearch::default(), StubFetcher::default());
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;

        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_of(response).await;
        assert!(body.contains("No tabs found."));
        assert!(body.contains(r#"action="/fetch""#));
        assert!(body.contains(r#"<option value="Wonderwall - Oasis">"#));
    }

    #[actix_web::test]
    async fn fetch_redirects_then_page_shows_cached_tab() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), StubSearch::default(), StubFetcher::default());
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;

        let response = test::call_service(&app, fetch_request("wonderwall", "Oasis").to_request()).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/?song=Wonderwall"
        );

        let request = test::TestRequest::get().uri("/?song=Wonderwall").to_request();
        let body = body_of(test::call_service(&app, request).await).await;
        assert!(body.contains("<h1>Wonderwall</h1>"));
        assert!(body.contains("e|-----0-----|"));
        assert!(body.contains(r#"<iframe src="https://www.youtube.com/embed/6hzrDeceEKc""#));
        assert!(body.contains(r#"<option value="wonderwall" selected>Wonderwall</option>"#));

        let response = test::call_service(&app, fetch_request("Wonderwall", "").to_request()).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(state.finder.fetcher().calls(), 1);
        assert_eq!(state.finder.resolver().provider().queries().len(), 2);
    }

    #[actix_web::test]
    async fn failures_are_told_apart() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), StubSearch::failing(), StubFetcher::default()))
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;
        let response = test::call_service(&app, fetch_request("Wonderwall", "Oasis").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), StubSearch::with_urls(&[]), StubFetcher::default()))
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;
        let response = test::call_service(&app, fetch_request("Wonderwall", "Oasis").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_of(response).await.contains("Could not find tab."));

        let response = test::call_service(&app, fetch_request(" '- ", "").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_song_shows_placeholder_and_text_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), StubSearch::default(), StubFetcher::default());
        state
            .finder
            .cache()
            .write_tab_if_absent(&Slug::from_title("Blackbird"), "<pre>&lt;b&gt;x|--0--|</pre>")
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;

        let body = body_of(test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await).await;
        assert!(body.contains("<h1>Blackbird</h1>"));
        assert!(body.contains("&lt;b&gt;x|--0--|"));

        let request = test::TestRequest::get().uri("/?song=Yesterday").to_request();
        let body = body_of(test::call_service(&app, request).await).await;
        assert!(body.contains("Tab file not found."));
        assert!(body.contains(r#"<option value="blackbird">Blackbird</option>"#));
    }

    fn remove_field(body: &str) -> String {
        Html::parse_document(body)
            .select(selector!(r#"form[action="/remove"] input[name="song"]"#))
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap()
            .to_owned()
    }

    #[actix_web::test]
    async fn remove_button_forgets_the_song() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), StubSearch::default(), StubFetcher::default());
        let slug = Slug::from_title("Wonderwall");
        state.finder.cache().write_tab_if_absent(&slug, "<pre>x</pre>").unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;

        let body = body_of(test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await).await;
        let request = test::TestRequest::post()
            .uri("/remove")
            .set_form([("song", remove_field(&body))])
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(!state.finder.cache().has_tab(&slug));
    }

    #[actix_web::test]
    async fn titles_with_filename_hostile_characters_can_be_viewed_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), StubSearch::default(), StubFetcher::default());
        let slug = Slug::from_title("What's Up?");
        assert_eq!(slug.as_str(), "whatsup_");
        state
            .finder
            .cache()
            .write_tab_if_absent(&slug, "<pre>e|--3--2--0--|</pre>")
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;

        let body = body_of(test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await).await;
        assert!(body.contains(r#"<option value="whatsup_" selected>Whatsup</option>"#));
        assert!(body.contains("<h1>Whatsup</h1>"));
        assert!(body.contains("e|--3--2--0--|"));
        assert!(!body.contains("Tab file not found."));

        let request = test::TestRequest::get().uri("/?song=whatsup_").to_request();
        let body = body_of(test::call_service(&app, request).await).await;
        assert!(body.contains("e|--3--2--0--|"));

        let request = test::TestRequest::post()
            .uri("/remove")
            .set_form([("song", remove_field(&body))])
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::FOUND);
        assert!(!state.finder.cache().has_tab(&slug));
    }

    #[actix_web::test]
    async fn songsterr_embed_page() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), StubSearch::default(), StubFetcher::default()))
                .configure(routes::<StubSearch, StubFetcher>),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/songsterr/embed?artist=The+Animals&title=House+of+the+Rising+Sun&id=14")
            .to_request();
        let body = body_of(test::call_service(&app, request).await).await;
        assert!(body.contains(
            r#"<iframe src="https://www.songsterr.com/a/wsa/the-animals-house-of-the-rising-sun-tab-s14t0""#
        ));

        let request = test::TestRequest::get()
            .uri("/songsterr/embed?artist=a&title=b&id=abc")
            .to_request();
        let body = body_of(test::call_service(&app, request).await).await;
        assert!(body.contains("Song ID must be a number."));

        let request = test::TestRequest::get().uri("/songsterr").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_of(response).await.contains("<iframe"));
    }
}
