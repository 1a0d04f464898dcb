use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

/// "Authenticating..." while waiting for the redirect and the exchange,
/// or the failure reason until the app returns to the login screen.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect_fixed(72, 12, area);
    frame.render_widget(Clear, dialog);

    let lines = match app.login_error {
        Some(ref error) => vec![
            Line::from(""),
            Line::from(Span::styled("  Authentication Error", styles::error_style())),
            Line::from(""),
            Line::from(Span::styled(format!("  {}", error), styles::list_item_style())),
            Line::from(""),
            Line::from(Span::styled("  Redirecting to login...", styles::muted_style())),
        ],
        None => {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled("  Authenticating...", styles::title_style())),
                Line::from(""),
                Line::from(Span::styled(
                    "  Please wait while we log you in. Finish the login in your browser.",
                    styles::list_item_style(),
                )),
                Line::from(vec![
                    Span::styled("  Listening on ", styles::muted_style()),
                    Span::styled(app.redirect_uri().to_string(), styles::highlight_style()),
                ]),
            ];
            if let Some(ref url) = app.authorization_url {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "  If no browser opened, visit:",
                    styles::muted_style(),
                )));
                lines.push(Line::from(Span::styled(
                    format!("  {}", url),
                    styles::list_item_style(),
                )));
            }
            lines
        }
    };

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
