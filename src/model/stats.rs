#[derive(Debug, Default)]
pub struct Stats {
    n_rows: i32,
    n_fiat_rows: i32,
    n_undated_rows: i32,
    n_skipped_rows: i32,
}

impl Stats {
    pub fn inc_rows(&mut self) {
        self.n_rows += 1;
    }

    pub fn inc_fiat(&mut self) {
        self.n_fiat_rows += 1;
    }

    pub fn inc_undated(&mut self) {
        self.n_undated_rows += 1;
    }

    pub fn inc_skipped(&mut self) {
        self.n_skipped_rows += 1;
    }

    pub fn pretty_print(&self) {
        println!("{self:#?}");
        println!();
    }
}
