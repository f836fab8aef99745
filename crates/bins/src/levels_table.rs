use controller::levels::LevelRegistry;
use controller::state::RunState;
use prettytable::{format, row, Table};

pub fn levels_table(levels: &LevelRegistry, state: &RunState) -> Table {
    let mut table = Table::new();
    let format = format::FormatBuilder::new()
        .separator(
            format::LinePosition::Title,
            format::LineSeparator::new('-', '-', '-', '-'),
        )
        .padding(1, 1)
        .build();
    table.set_format(format);
    table.set_titles(row!["id", "title", "points", "attempts", "status"]);
    for level in levels.iter() {
        let status = if state.is_completed(level.id) {
            "done"
        } else {
            ""
        };
        table.add_row(row![
            level.id,
            level.title,
            level.points,
            state.attempts(level.id),
            status
        ]);
    }
    table
}

pub fn print_levels_table(levels: &LevelRegistry, state: &RunState) {
    levels_table(levels, state).printstd();
}
