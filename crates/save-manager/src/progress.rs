use colored::Colorize;

/// Receives per-file progress from long-running imports and exports.
pub trait Progress {
    fn begin(&mut self, _title: &str, _total: usize) {}

    /// `index` counts from 1.
    fn step(&mut self, index: usize, total: usize, name: &str);

    fn skipped(&mut self, _name: &str, _reason: &str) {}

    fn end(&mut self) {}
}

/// Prints one coloured line per file.
#[derive(Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn begin(&mut self, title: &str, total: usize) {
        println!("{} {}", title.bold(), format!("({total} files)").dimmed());
    }

    fn step(&mut self, _index: usize, _total: usize, name: &str) {
        println!("+ {} {}", "Adding", name.green());
    }

    fn skipped(&mut self, name: &str, reason: &str) {
        eprintln!("{} {} {}", "File".dimmed(), name.dimmed(), reason.dimmed());
    }
}

#[derive(Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn step(&mut self, _index: usize, _total: usize, _name: &str) {}
}
