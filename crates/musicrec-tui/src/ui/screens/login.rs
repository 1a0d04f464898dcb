use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.login_error.is_some() { 16 } else { 14 };
    let dialog = centered_rect_fixed(56, height, area);
    frame.render_widget(Clear, dialog);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Discover new music powered by Machine Learning",
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Smart Discovery  ", styles::highlight_style()),
            Span::styled("learns from your preferences", styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("   Personalized     ", styles::highlight_style()),
            Span::styled("tailored to your taste", styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled("   Multi-User       ", styles::highlight_style()),
            Span::styled("isolated data per account", styles::muted_style()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "   Connect your Spotify account to get started",
            styles::list_item_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("           ["),
            Span::styled(" ▶ Login with Spotify ◀ ", styles::selected_style()),
            Span::raw("]  "),
            Span::styled("Enter", styles::help_key_style()),
        ]),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("   {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .title(" Login ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, dialog);
}
