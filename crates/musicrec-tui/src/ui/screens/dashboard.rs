use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stat cards
            Constraint::Length(3), // Expand dataset
            Constraint::Min(6),    // Recommendations
        ])
        .split(area);

    render_stats(frame, app, chunks[0]);
    render_expand(frame, app, chunks[1]);
    render_recommendations(frame, app, chunks[2]);
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let stats = app.stats.clone().unwrap_or_default();
    let values = [
        ("Total Songs", stats.total_songs),
        ("Liked Songs", stats.total_liked),
        ("Total Feedback", stats.total_feedback),
        ("Feedback Liked", stats.feedback_liked),
    ];

    for ((label, value), card) in values.into_iter().zip(cards.iter()) {
        let text = vec![Line::from(Span::styled(
            format_count(value),
            styles::stat_value_style(),
        ))];
        let block = Block::default()
            .title(format!(" {} ", label))
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        frame.render_widget(
            Paragraph::new(text).alignment(Alignment::Center).block(block),
            *card,
        );
    }
}

fn render_expand(frame: &mut Frame, app: &App, area: Rect) {
    let action = if app.expanding {
        Span::styled("Expanding...", styles::highlight_style())
    } else {
        Span::styled("[e] Expand Dataset", styles::help_key_style())
    };
    let line = Line::from(vec![
        Span::styled(
            " Import Spotify liked songs and discover similar tracks from Last.fm   ",
            styles::muted_style(),
        ),
        action,
    ]);

    let block = Block::default()
        .title(" Expand Your Dataset ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_recommendations(frame: &mut Frame, app: &App, area: Rect) {
    let mut title = vec![Span::styled(
        " Personalized Recommendations ",
        styles::title_style(),
    )];
    if let Some(ref mode) = app.mode {
        title.push(Span::styled(
            format!(" {} Mode ", mode),
            styles::mode_badge_style(app.is_ml_mode()),
        ));
        title.push(Span::styled(
            format!(" {} ", mode_description(app.is_ml_mode())),
            styles::muted_style(),
        ));
    }

    let block = Block::default()
        .title(Line::from(title))
        .title_bottom(Line::from(Span::styled(
            " [p] Previous  [g] Generate  [n] Next  [l] Like  [s] Skip  [o] Open ",
            styles::muted_style(),
        )))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if app.loading_batch {
        let text = Paragraph::new(Line::from(Span::styled(
            "Loading recommendations...",
            styles::highlight_style(),
        )))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(text, area);
        return;
    }

    if app.tracks.is_empty() {
        let text = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No recommendations yet", styles::list_item_style())),
            Line::from(Span::styled(
                "Press g to generate your first batch",
                styles::muted_style(),
            )),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(text, area);
        return;
    }

    let header = Row::new([
        Cell::from("Track"),
        Cell::from("Artist"),
        Cell::from("Album"),
        Cell::from("Year"),
        Cell::from("Source"),
        Cell::from(""),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = app
        .tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let style = if i == app.selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let feedback = match app.feedback_for(track) {
                Some(true) => Cell::from(Span::styled("Liked", styles::success_style())),
                Some(false) => Cell::from(Span::styled("Skipped", styles::muted_style())),
                None => Cell::from(""),
            };

            Row::new(vec![
                Cell::from(track.track_name.clone()),
                Cell::from(track.artist.clone()),
                Cell::from(track.album.clone().unwrap_or_default()),
                Cell::from(track.year.clone().unwrap_or_default()),
                Cell::from(track.source_display().unwrap_or_default()),
                feedback,
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(6),
        Constraint::Fill(1),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn mode_description(ml: bool) -> &'static str {
    if ml {
        "ML-powered predictions based on your feedback"
    } else {
        "Random selection from your dataset"
    }
}

/// Thousands separators, e.g. 12,345
fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
