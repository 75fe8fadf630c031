use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};
use std::io;

use crate::lib::allocation::{ClusterMetrics, NodeAllocatedResources};

const HEADERS: [&str; 8] = [
    "Name",
    "Nodes",
    "CPU Requests",
    "CPU Limits",
    "Memory Requests",
    "Memory Limits",
    "Pods",
    "Kind",
];

/// One table row, already formatted
#[derive(Debug, Clone, PartialEq)]
struct AllocationRow {
    cells: [String; 8],
}

fn format_millicores(millicores: i64) -> String {
    format!("{}m", millicores)
}

fn format_bytes(bytes: i64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let value = bytes as f64;
    if value.abs() >= GIB {
        format!("{:.2}Gi", value / GIB)
    } else {
        format!("{:.0}Mi", value / MIB)
    }
}

fn usage(used: String, total: String, percentage: f64) -> String {
    format!("{used}/{total} ({percentage:.1}%)")
}

impl AllocationRow {
    fn new(name: &str, kind: &str, resources: &NodeAllocatedResources) -> Self {
        let cpu_total = format_millicores(resources.cpu_total);
        let memory_total = format_bytes(resources.memory_total);
        Self {
            cells: [
                name.to_string(),
                resources.node_count.to_string(),
                usage(
                    format_millicores(resources.cpu_requests),
                    cpu_total.clone(),
                    resources.cpu_requests_percentage,
                ),
                usage(
                    format_millicores(resources.cpu_limits),
                    cpu_total,
                    resources.cpu_limits_percentage,
                ),
                usage(
                    format_bytes(resources.memory_requests),
                    memory_total.clone(),
                    resources.memory_requests_percentage,
                ),
                usage(
                    format_bytes(resources.memory_limits),
                    memory_total,
                    resources.memory_limits_percentage,
                ),
                usage(
                    resources.pods_allocated.to_string(),
                    resources.pods_total.to_string(),
                    resources.pods_allocated_percentage,
                ),
                kind.to_string(),
            ],
        }
    }
}

/// Totals first, then instance type groups, then nodes.
fn rows(metrics: &ClusterMetrics) -> Vec<AllocationRow> {
    let mut rows = vec![AllocationRow::new("(all)", "total", &metrics.totals)];
    for group in metrics.instance_types.iter().flatten() {
        let name = if group.instance_type.is_empty() {
            "(no instance type)"
        } else {
            group.instance_type.as_str()
        };
        rows.push(AllocationRow::new(name, "instance type", group));
    }
    for node in metrics.nodes.iter().flatten() {
        rows.push(AllocationRow::new(&node.node_name, "node", node));
    }
    rows
}

pub fn display_allocation_table(metrics: &ClusterMetrics) -> io::Result<()> {
    let data = rows(metrics);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &data);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    data: &[AllocationRow],
) -> io::Result<()> {
    let mut state = TableState::default();
    state.select(Some(0));

    loop {
        terminal.draw(|f| {
            let header_cells = HEADERS.iter().map(|h| {
                Cell::from(*h).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            });
            let header = Row::new(header_cells)
                .style(Style::default().bg(Color::DarkGray))
                .height(1);

            let rows = data
                .iter()
                .map(|row| Row::new(row.cells.iter().cloned().map(Cell::from)).height(1));

            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(18),
                    Constraint::Percentage(6),
                    Constraint::Percentage(14),
                    Constraint::Percentage(14),
                    Constraint::Percentage(15),
                    Constraint::Percentage(15),
                    Constraint::Percentage(10),
                    Constraint::Percentage(8),
                ],
            )
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Allocated Resources (Press 'q' to quit) "),
            )
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");

            f.render_stateful_widget(table, f.area(), &mut state);
        })?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => {
                        let i = state.selected().map_or(0, |i| (i + 1) % data.len());
                        state.select(Some(i));
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        let i = state
                            .selected()
                            .map_or(0, |i| (i + data.len() - 1) % data.len());
                        state.select(Some(i));
                    }
                    _ => {}
                }
            }
        }
    }
}
