use crate::app::App;
use crate::theme::StyleMap;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tokio::time::Instant;

use super::help::centered_rect;

/// Render the text dialog over the pages.
pub fn render(f: &mut Frame, app: &App) {
    let Some(dialog) = app.dialog.as_ref() else {
        return;
    };
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let title = match dialog.remaining(Instant::now()) {
        Some(left) => format!(" {} ({}s) ", dialog_title(dialog.source()), left.as_secs() + 1),
        None => format!(" {} (Esc to close) ", dialog_title(dialog.source())),
    };
    let title_style = if dialog.countdown().is_some() {
        app.style("dialog_countdown")
    } else {
        app.style("dialog_heading")
    };

    let lines = render_markdown(dialog.text(), &app.theme);
    let scroll = dialog.scroll().min(u16::MAX as usize) as u16;
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(Span::styled(title, title_style)),
        )
        .style(app.style("dialog_body"))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, overlay);
}

fn dialog_title(source: &str) -> &'static str {
    match source {
        crate::assets::UPDATE_LOG => "What's new",
        _ => "Help",
    }
}

/// Number of unwrapped lines the dialog text renders to.
pub(super) fn dialog_line_count(md: &str) -> usize {
    render_markdown(md, &StyleMap::default()).len()
}

/// Convert markdown to styled ratatui Lines.
pub fn render_markdown(md: &str, styles: &StyleMap) -> Vec<Line<'static>> {
    let parser = Parser::new(md);
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(md.lines().count());
    let mut current_spans: Vec<Span<'static>> = Vec::with_capacity(4);
    let mut in_code_block = false;
    let mut in_heading = false;
    let mut in_emphasis = false;
    let mut in_strong = false;
    let mut list_depth = 0usize;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                lines.push(Line::from(""));
                in_heading = false;
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Item) => {
                current_spans.push(Span::raw(format!(
                    "{}• ",
                    "  ".repeat(list_depth.saturating_sub(1))
                )));
            }
            Event::End(TagEnd::Item) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::Emphasis) => in_emphasis = true,
            Event::End(TagEnd::Emphasis) => in_emphasis = false,
            Event::Start(Tag::Strong) => in_strong = true,
            Event::End(TagEnd::Strong) => in_strong = false,
            Event::Text(text) => {
                if in_code_block {
                    // Code blocks keep their own line breaks
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("  {line}"),
                            styles.resolve("dialog_code"),
                        )));
                    }
                    continue;
                }
                let style = if in_heading {
                    styles.resolve("dialog_heading")
                } else if in_strong {
                    styles.resolve("dialog_strong")
                } else if in_emphasis {
                    styles.resolve("dialog_emphasis")
                } else {
                    styles.resolve("dialog_body")
                };
                current_spans.push(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => {
                current_spans.push(Span::styled(
                    format!("`{}`", code),
                    styles.resolve("dialog_code"),
                ));
            }
            Event::SoftBreak => {
                current_spans.push(Span::raw(" "));
            }
            Event::HardBreak => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            _ => {}
        }
    }

    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }

    // Drop the trailing blank separator
    while lines.last().is_some_and(|l| l.spans.is_empty() || l.width() == 0) {
        lines.pop();
    }

    lines
}
