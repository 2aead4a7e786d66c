use axum::response::Html;
use chrono::Datelike;

const CHAT_PAGE: &str = include_str!("../../../templates/chat.html");
const ABOUT_PAGE: &str = include_str!("../../../templates/about.html");

pub async fn index() -> Html<String> {
    Html(render(CHAT_PAGE, current_year()))
}

pub async fn about() -> Html<String> {
    Html(render(ABOUT_PAGE, current_year()))
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn render(template: &str, year: i32) -> String {
    template.replace("{{year}}", &year.to_string())
}
