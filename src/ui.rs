//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  This makes it easy to change the
//! visual layout without touching the loader.
//!
//! ## For contributors
//!
//! * The layout is a four-row split: the filter bar, the post list, the
//!   load-more control, and a one-line live region for announcements.
//! * The load-more control renders [`Affordance::text`]; its border title is
//!   the accessible label, so screen readers that scrape the terminal get the
//!   same wording as the browser theme's `aria-label`.
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::announce::Politeness;
use crate::app::App;
use crate::filter::PostType;
use crate::loader::{Affordance, LoaderState};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [filter_area, list_area, control_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_filter_bar(app, frame, filter_area);
    draw_post_list(app, frame, list_area);
    draw_load_more(app, frame, control_area);
    draw_status_bar(app, frame, status_area);
}

/// Render the post-type menu with the active option highlighted.
fn draw_filter_bar(app: &App, frame: &mut Frame, area: Rect) {
    let active = app.active_filter();

    let mut spans = vec![Span::styled(
        " Filter Posts By: ",
        Style::default().fg(Color::DarkGray),
    )];
    for (n, post_type) in PostType::ALL.into_iter().enumerate() {
        let style = if post_type == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(
            format!(" {}:{} ", n + 1, post_type.label()),
            style,
        ));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the scrollable list of visible posts.
fn draw_post_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .grid
        .visible()
        .map(|post| {
            let tag = post
                .primary_tag
                .as_deref()
                .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_else(|| "untagged".into());
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("{:<12}", format!("[{tag}]")),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(" "),
                Span::styled(&post.title, Style::default().fg(Color::White)),
            ])];
            if let Some(excerpt) = &post.excerpt {
                lines.push(Line::from(Span::styled(
                    format!("             {excerpt}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(Text::from(lines))
        })
        .collect();

    let title = format!(
        " Posts ({} of {}) ",
        app.grid.visible_len(),
        app.grid.items().len()
    );

    let mut block = Block::default()
        .title(title)
        .title(Line::from(format!(" {} ", app.grid.predicate())).right_aligned())
        .borders(Borders::ALL);
    if let Some(link) = app.selected_post().and_then(|p| p.link.as_deref()) {
        block = block.title_bottom(Line::from(format!(" {link} ")).right_aligned());
    }

    let list = List::new(list_items)
        .block(block)
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the load-more control.
fn draw_load_more(app: &App, frame: &mut Frame, area: Rect) {
    let affordance = app.affordance();
    let style = if affordance.is_disabled() {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    } else if affordance == Affordance::Busy {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    };

    let retrying = app.loader_state()
        == LoaderState::ErrorIdle {
            retry_scheduled: true,
        };
    let hint = if app.loader().is_filter_exhausted() {
        "  (f: try another filter)"
    } else if retrying {
        "  (retrying shortly)"
    } else {
        ""
    };

    let control = Paragraph::new(Line::from(vec![
        Span::styled(affordance.text(), style),
        Span::styled(hint, Style::default().fg(Color::DarkGray)),
    ]))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(format!(" {} ", affordance.label()))
                .borders(Borders::ALL)
                .border_style(style),
        );
    frame.render_widget(control, area);
}

/// Render the live region and the key help.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let announcement = match app.announcement() {
        Some(a) if a.politeness == Politeness::Assertive => {
            Span::styled(a.text.clone(), Style::default().fg(Color::Red))
        }
        Some(a) => Span::styled(a.text.clone(), Style::default().fg(Color::Yellow)),
        None => Span::raw(""),
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        announcement,
        Span::raw("  "),
        Span::styled(
            format!("{} posts", app.grid.visible_len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  ↑/↓: scroll  Enter/m: load more  f/1-5: filter"),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
