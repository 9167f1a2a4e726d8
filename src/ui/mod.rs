mod components;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, FormField, Popup, Screen, CARD_COLUMNS};
use crate::inventory::{Filter, ItemType, Location, LocationGroup};
use crate::theme::Theme;

use components::{centered_rect, key_hint, section_title};

// Set once at startup from the config; falls back to built-in colors
static THEME: OnceLock<Theme> = OnceLock::new();

pub fn set_theme(theme: Theme) {
    if THEME.set(theme).is_err() {
        tracing::debug!("Theme already initialised");
    }
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }
fn card_back() -> Color { theme().card_back }
fn card_face() -> Color { theme().card_face }

fn location_icon(location: Location) -> &'static str {
    match location {
        Location::PantryCloset => "🏠",
        Location::Basement => "📦",
        Location::Office => "💼",
        Location::Garage => "🚗",
    }
}

fn type_icon(item_type: ItemType) -> (&'static str, Color) {
    match item_type {
        ItemType::PantryItem => ("🍴", accent()),
        ItemType::Supply => ("💡", success()),
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Screen body
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_header(f, app, chunks[1]);
    match app.screen {
        Screen::Inventory => draw_inventory(f, app, chunks[2]),
        Screen::Game => draw_game(f, app, chunks[2]),
    }
    draw_footer(f, app, chunks[3]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::AddItem => draw_add_item_popup(f, app),
        Popup::Help => draw_help_popup(f),
        Popup::ConfirmDelete => draw_confirm_popup(f, app),
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status, Style::default().fg(warning())))
    } else if !app.tracker.is_watching() {
        Line::from(Span::styled("Offline: item store unavailable", Style::default().fg(danger())))
    } else if !app.tracker.skipped().is_empty() {
        let count = app.tracker.skipped().len();
        Line::from(Span::styled(
            format!("{} malformed item(s) hidden, see log", count),
            Style::default().fg(danger()),
        ))
    } else {
        Line::from(Span::styled("Ready", Style::default().fg(text_dim())))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let tab = |label: &'static str, screen: Screen| {
        if app.screen == screen {
            Span::styled(format!(" {} ", label), Style::default().fg(accent()).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(format!(" {} ", label), Style::default().fg(inactive()))
        }
    };

    let mut spans = vec![
        tab("Home Inventory", Screen::Inventory),
        Span::styled("│", Style::default().fg(inactive())),
        tab("Memory Cards", Screen::Game),
    ];
    if let Some(user) = app.auth.user_id() {
        spans.push(Span::styled("   User ID: ", Style::default().fg(text_dim())));
        spans.push(Span::styled(user, Style::default().fg(text_dim())));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(inactive()));
    let title = Paragraph::new(vec![
        Line::from(Span::styled("pantry", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(spans),
    ])
    .alignment(Alignment::Center)
    .block(block);

    f.render_widget(title, area);
}

fn draw_inventory(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4)])
        .split(area);

    draw_filter_bar(f, app.tracker.filter(), chunks[0]);

    let view = app.tracker.view();

    // 2x2 grid of location boxes; narrow terminals stack them
    let boxes: Vec<Rect> = if area.width < 70 {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(chunks[1])
            .to_vec()
    } else {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, 2); 2])
            .split(chunks[1]);
        rows.iter()
            .flat_map(|row| {
                Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Ratio(1, 2); 2])
                    .split(*row)
                    .to_vec()
            })
            .collect()
    };

    // Selection is a flat index across groups in display order
    let mut offset = 0;
    for (group, rect) in view.groups.iter().zip(boxes) {
        draw_location_box(f, app, group, offset, rect);
        offset += group.items.len();
    }
}

fn draw_filter_bar(f: &mut Frame, active: Filter, area: Rect) {
    let filters = [
        ("1", Filter::All),
        ("2", Filter::Only(ItemType::PantryItem)),
        ("3", Filter::Only(ItemType::Supply)),
    ];

    let mut spans = Vec::new();
    for (key, filter) in filters {
        let style = if filter == active {
            Style::default().fg(text()).bg(accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text_dim())
        };
        spans.push(Span::styled(format!(" {} ", key), Style::default().fg(accent())));
        spans.push(Span::styled(format!(" {} ", filter.label()), style));
        spans.push(Span::raw("  "));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_location_box(f: &mut Frame, app: &App, group: &LocationGroup, offset: usize, area: Rect) {
    let has_selection = app.selected_item >= offset && app.selected_item < offset + group.items.len();
    let border_color = if has_selection { accent() } else { inactive() };

    let block = Block::default()
        .title(section_title(
            &format!("{} {}", location_icon(group.location), group.location),
            has_selection,
            accent(),
            inactive(),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    if group.items.is_empty() {
        let placeholder = group.placeholder.clone().unwrap_or_default();
        let empty = Paragraph::new(Span::styled(
            placeholder,
            Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC),
        ))
        .wrap(Wrap { trim: true })
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = group
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (icon, icon_color) = type_icon(item.item_type());
            let quantity_color = if item.quantity() == 0 { danger() } else { text() };
            let row_style = if offset + i == app.selected_item {
                Style::default().bg(bg_selected()).fg(text())
            } else {
                Style::default()
            };

            Row::new(vec![
                Span::styled(icon, Style::default().fg(icon_color)),
                Span::styled(item.name().to_string(), Style::default().fg(text())),
                Span::styled(
                    format!("{:>4}", item.quantity()),
                    Style::default().fg(quantity_color).add_modifier(Modifier::BOLD),
                ),
            ])
            .style(row_style)
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(3), Constraint::Min(8), Constraint::Length(5)],
    )
    .block(block);

    f.render_widget(table, area);
}

fn draw_game(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(section_title("Memory Cards", true, accent(), inactive()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cards = app.grid.cards();
    if cards.is_empty() {
        let empty = Paragraph::new(Span::styled("No cards in this deck.", Style::default().fg(text_dim())))
            .alignment(Alignment::Center);
        f.render_widget(empty, inner);
        return;
    }

    let row_count = cards.len().div_ceil(CARD_COLUMNS);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(5); row_count])
        .split(inner);

    for (r, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, CARD_COLUMNS as u32); CARD_COLUMNS])
            .split(*row_area);

        for (c, cell) in cols.iter().enumerate() {
            let index = r * CARD_COLUMNS + c;
            let Some(card) = cards.get(index) else {
                break;
            };

            let selected = index == app.selected_card;
            let border = if selected { accent() } else { inactive() };
            let (lines, color) = if card.face_up {
                (
                    vec![Line::from(card.icon.clone()), Line::from(card.word.clone())],
                    card_face(),
                )
            } else {
                (vec![Line::from("?"), Line::from("")], card_back())
            };

            let tile = Paragraph::new(lines)
                .style(Style::default().fg(color))
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(border)),
                );
            f.render_widget(tile, *cell);
        }
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.screen {
        Screen::Inventory => vec![
            ("↑↓", "Nav"),
            ("+/-", "Qty"),
            ("a", "Add"),
            ("d", "Del"),
            ("f", "Filter"),
            ("Tab", "Game"),
            ("?", "Help"),
        ],
        Screen::Game => vec![
            ("←↑↓→", "Nav"),
            ("Space", "Flip"),
            ("n", "New game"),
            ("Tab", "Inventory"),
            ("?", "Help"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else if area.width < 80 { 5 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| key_hint(key, action, accent(), text_dim()))
        .collect();

    f.render_widget(Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center), area);
}

fn draw_add_item_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(if area.width < 80 { 90 } else { 50 }, 40, area);
    f.render_widget(Clear, popup_area);

    let form = &app.form;
    let field = |label: &str, value: String, which: FormField| {
        let active = form.field == which;
        let label_style = if active {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text_dim())
        };
        let cursor = if active && matches!(which, FormField::Name | FormField::Quantity) { "▏" } else { "" };
        Line::from(vec![
            Span::styled(format!("  {:<10}", label), label_style),
            Span::styled(format!("{}{}", value, cursor), Style::default().fg(text())),
        ])
    };

    let lines = vec![
        Line::from(""),
        field("Name", form.name.clone(), FormField::Name),
        field("Quantity", form.quantity.clone(), FormField::Quantity),
        field("Location", format!("◂ {} ▸", form.location), FormField::Location),
        field("Type", format!("◂ {} ▸", form.item_type), FormField::Type),
        Line::from(""),
        Line::from(
            [
                key_hint("Tab", "Next field", accent(), text_dim()),
                key_hint("Space", "Change", accent(), text_dim()),
                key_hint("Enter", "Add", accent(), text_dim()),
                key_hint("Esc", "Cancel", accent(), text_dim()),
            ]
            .concat(),
        ),
    ];

    let popup = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(" Add New Item ", Style::default().fg(accent())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent())),
    );
    f.render_widget(popup, popup_area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let heading = |s: &'static str| {
        Line::from(Span::styled(s, Style::default().fg(header()).add_modifier(Modifier::BOLD)))
    };
    let entry = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), Style::default().fg(accent())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        heading("═══ Inventory ═══"),
        entry("↑/↓ j/k", "Move between items"),
        entry("+ / -", "Increase/decrease quantity (never below 0)"),
        entry("a", "Add a new item"),
        entry("d", "Delete selected item"),
        entry("f 1 2 3", "Filter: All, Pantry Items, Supplies"),
        Line::from(""),
        heading("═══ Memory Cards ═══"),
        entry("arrows", "Move between cards"),
        entry("Space", "Flip selected card"),
        entry("n", "Shuffle and deal a new game"),
        Line::from(""),
        heading("═══ General ═══"),
        entry("Tab", "Switch between inventory and game"),
        entry("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" pantry Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(40, 20, f.area());

    f.render_widget(Clear, popup_area);

    let message = app
        .pending_delete
        .as_ref()
        .map(|item| format!("Delete {}?", item.name()))
        .unwrap_or_else(|| "Confirm?".to_string());

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(warning()))),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(success()).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(danger()).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(warning())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(warning())),
    )
    .alignment(Alignment::Center);

    f.render_widget(confirm, popup_area);
}
