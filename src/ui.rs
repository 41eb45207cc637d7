use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Tabs},
};

use crate::model::{Model, UIData};
use crate::view::TableRender;

pub const TABS_HEIGHT: usize = 1;
pub const TOOLBAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
const CHECKBOX_WIDTH: usize = 4; // "[x] "

#[derive(Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let max_column_width = model.config().max_column_width;

        let [tabs_area, toolbar_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(TABS_HEIGHT as u16),
            Constraint::Length(TOOLBAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Self::tabs(&uidata), tabs_area);
        frame.render_widget(Self::toolbar(uidata.table), toolbar_area);

        self.table_state.select(Some(uidata.cursor));
        frame.render_stateful_widget(
            Self::table(uidata.table, max_column_width),
            table_area,
            &mut self.table_state,
        );

        frame.render_widget(
            Paragraph::new(Line::from(uidata.status_message.to_string()).italic()),
            status_area,
        );

        if let Some(message) = uidata.popup_message {
            Self::popup(message, frame);
        }
    }

    fn tabs<'a>(uidata: &UIData<'a>) -> Tabs<'a> {
        Tabs::new(uidata.tables.iter().map(|t| Line::from(*t)))
            .select(uidata.active)
            .highlight_style(Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }

    fn toolbar(table: &TableRender) -> Line<'static> {
        Line::from(vec![
            format!(" {} ", table.control.icon()).blue().bold(),
            format!("{} ", table.control.label()).into(),
            "<A>".blue().bold(),
            Span::from(format!(" │ {} of {} selected │ ", table.selected, table.rows.len())).yellow(),
            "<R>".blue().bold(),
            " Refresh  ".into(),
            "<D>".blue().bold(),
            " Delete selected  ".into(),
            "<S>".blue().bold(),
            " Settings  ".into(),
            "<?>".blue().bold(),
            " Help".into(),
        ])
    }

    fn column_widths(table: &TableRender, max_column_width: usize) -> Vec<Constraint> {
        let mut widths: Vec<usize> = table.header.iter().map(|h| h.chars().count()).collect();
        for row in table.rows.iter() {
            if let Some(w) = widths.first_mut() {
                *w = (*w).max(row.label.chars().count());
            }
            for (w, cell) in widths.iter_mut().skip(1).zip(row.cells.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
            .into_iter()
            .enumerate()
            .map(|(idx, w)| {
                let w = std::cmp::min(w, max_column_width) + COLUMN_WIDTH_MARGIN;
                let w = if idx == 0 { w + CHECKBOX_WIDTH } else { w };
                Constraint::Length(w as u16)
            })
            .collect()
    }

    fn table(table: &TableRender, max_column_width: usize) -> Table<'_> {
        let header = Row::new(
            table
                .header
                .iter()
                .enumerate()
                .map(|(idx, h)| {
                    if idx == 0 {
                        Cell::from(format!("{:width$}{}", "", h, width = CHECKBOX_WIDTH))
                    } else {
                        Cell::from(h.as_str())
                    }
                }),
        )
        .style(Style::new().bold().underlined());

        let rows = table.rows.iter().map(|row| {
            let checkbox = if row.checked { "[x] " } else { "[ ] " };
            let mut cells = Vec::with_capacity(row.cells.len() + 1);
            cells.push(Cell::from(format!("{checkbox}{}", row.label)));
            cells.extend(row.cells.iter().map(|c| Cell::from(c.as_str())));
            let style = if row.highlighted {
                Style::new().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::new()
            };
            Row::new(cells).style(style)
        });

        Table::new(rows, Self::column_widths(table, max_column_width))
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .highlight_symbol("▶")
    }

    fn popup(message: &str, frame: &mut Frame) {
        let height = message.lines().count() as u16 + 2;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let area = Self::centered(frame.area(), width, height);

        let block = Block::bordered().title(Line::from(" Help ".bold()).centered());
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(message.to_string()).block(block), area);
    }

    fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let [area] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(area);
        area
    }
}
