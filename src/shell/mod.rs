//! Line-oriented interactive front end: the table view, the product form and
//! the delete confirmation, driven one command at a time.

use std::io::Write;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::controller::{Controller, Mutation, MutationError};
use crate::gateway::Gateway;
use crate::model::{Field, ProductId};
use crate::output;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Show,
    Search(String),
    Sort(Field),
    Page(usize),
    Next,
    Prev,
    Add,
    Edit(usize),
    Delete(usize),
    Refresh,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  show                 redraw the table
  search <text>        filter rows (no text clears the search)
  sort <field>         sort by a column; repeat to flip the direction
  page <n> | next | prev
  add                  open the form for a new product
  edit <no>            edit the row with that No
  delete <no>          delete the row with that No (asks first)
  refresh              re-fetch the product list
  help | quit
fields: nama_barang (name), stok (stock), jumlah_terjual (sold),
        tanggal_transaksi (date), jenis_barang (category)";

fn parse_row_number(cmd: &str, rest: &str) -> Result<usize, String> {
    rest.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("usage: {cmd} <no>"))
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let cmd = match head.to_lowercase().as_str() {
            "show" | "ls" => Command::Show,
            "search" | "/" => Command::Search(rest.to_string()),
            "sort" => Command::Sort(
                Field::parse(rest).ok_or_else(|| format!("unknown field '{rest}'"))?,
            ),
            "page" => Command::Page(
                rest.parse::<usize>()
                    .map_err(|_| "usage: page <n>".to_string())?,
            ),
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "add" | "new" => Command::Add,
            "edit" => Command::Edit(parse_row_number("edit", rest)?),
            "delete" | "del" | "rm" => Command::Delete(parse_row_number("delete", rest)?),
            "refresh" | "reload" => Command::Refresh,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(cmd))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "ya")
}

pub struct Shell<'c, G, R, W> {
    controller: &'c mut Controller<G>,
    lines: Lines<R>,
    out: W,
    progress: bool,
}

impl<'c, G, R, W> Shell<'c, G, R, W>
where
    G: Gateway,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(controller: &'c mut Controller<G>, input: R, out: W, progress: bool) -> Self {
        Self {
            controller,
            lines: input.lines(),
            out,
            progress,
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn say(&mut self, text: &str) -> Result<(), String> {
        writeln!(self.out, "{text}").map_err(|e| format!("failed to write output: {e}"))
    }

    async fn ask(&mut self, prompt: &str) -> Result<Option<String>, String> {
        write!(self.out, "{prompt}")
            .and_then(|_| self.out.flush())
            .map_err(|e| format!("failed to write output: {e}"))?;
        self.lines
            .next_line()
            .await
            .map_err(|e| format!("failed to read input: {e}"))
    }

    fn flush_notices(&mut self) -> Result<(), String> {
        for notice in self.controller.take_notices() {
            let line = output::render_notice(&notice);
            self.say(&line)?;
        }
        Ok(())
    }

    fn render(&mut self) -> Result<(), String> {
        let state = self.controller.state();
        let mut text = String::new();
        if !state.view.search.is_empty() {
            text.push_str(&format!("search: \"{}\"\n", state.view.search));
        }
        text.push_str(&output::render_table(&state.page(), &state.view));
        self.say(&text)
    }

    fn row_id(&self, number: usize) -> Option<ProductId> {
        self.controller
            .page()
            .row_by_number(number)
            .map(|p| p.id.clone())
    }

    pub async fn refresh(&mut self) -> Result<(), String> {
        let pb = self.spinner("fetching products");
        self.controller.refresh().await;
        pb.finish_and_clear();
        self.flush_notices()
    }

    /// Reads commands until `quit` or end of input.
    pub async fn run(&mut self) -> Result<(), String> {
        self.render()?;
        loop {
            let Some(line) = self.ask("stockview> ").await? else {
                break;
            };
            let cmd = match Command::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(e) => {
                    self.say(&e)?;
                    continue;
                }
            };
            if !self.dispatch(cmd).await? {
                break;
            }
        }
        Ok(())
    }

    /// Returns `false` once the shell should stop.
    pub async fn dispatch(&mut self, cmd: Command) -> Result<bool, String> {
        match cmd {
            Command::Quit => return Ok(false),
            Command::Help => self.say(HELP)?,
            Command::Show => self.render()?,
            Command::Search(term) => {
                self.controller.set_search(&term);
                self.render()?;
            }
            Command::Sort(field) => {
                self.controller.click_header(field);
                self.render()?;
            }
            Command::Page(n) => {
                if self.controller.goto_page(n) {
                    self.render()?;
                } else {
                    self.say(&format!("page {n} does not exist"))?;
                }
            }
            Command::Next => {
                if self.controller.next_page() {
                    self.render()?;
                } else {
                    self.say("already on the last page")?;
                }
            }
            Command::Prev => {
                if self.controller.prev_page() {
                    self.render()?;
                } else {
                    self.say("already on the first page")?;
                }
            }
            Command::Refresh => {
                self.refresh().await?;
                self.render()?;
            }
            Command::Add => {
                self.controller.open_create();
                self.run_form().await?;
            }
            Command::Edit(number) => match self.row_id(number) {
                Some(id) => match self.controller.open_edit(&id) {
                    Ok(()) => self.run_form().await?,
                    Err(e) => self.say(&e.to_string())?,
                },
                None => self.say(&format!("no row {number} on this page"))?,
            },
            Command::Delete(number) => self.run_delete(number).await?,
        }
        Ok(true)
    }

    async fn run_form(&mut self) -> Result<(), String> {
        loop {
            let mode = self.controller.state().modal.mode();
            let title = match mode {
                crate::controller::ModalMode::Create => "Add Product",
                crate::controller::ModalMode::Edit => "Edit Product",
            };
            self.say(&format!("{title} (enter keeps the shown value, :cancel aborts)"))?;

            for field in Field::ALL {
                let current = self.controller.state().modal.draft.get(field).to_string();
                let prompt = if current.is_empty() {
                    format!("  {}: ", field.label())
                } else {
                    format!("  {} [{}]: ", field.label(), current)
                };
                let answer = match self.ask(&prompt).await? {
                    Some(answer) => answer,
                    None => {
                        self.controller.cancel_form();
                        return Ok(());
                    }
                };
                let answer = answer.trim();
                if answer == ":cancel" {
                    self.controller.cancel_form();
                    self.say("cancelled")?;
                    return self.render();
                }
                if !answer.is_empty() {
                    self.controller
                        .set_draft_field(field, answer)
                        .map_err(|e| e.to_string())?;
                }
            }

            let confirm = self
                .ask(&format!("  {}? [Y/n]: ", mode.submit_label()))
                .await?
                .unwrap_or_else(|| "n".to_string());
            if !confirm.trim().is_empty() && !is_yes(&confirm) {
                self.controller.cancel_form();
                self.say("cancelled")?;
                return self.render();
            }

            let pb = self.spinner("saving product");
            let result = self.controller.submit().await;
            pb.finish_and_clear();
            self.flush_notices()?;
            match result {
                Err(MutationError::Validation(_)) => continue,
                _ => return self.render(),
            }
        }
    }

    async fn run_delete(&mut self, number: usize) -> Result<(), String> {
        let Some(id) = self.row_id(number) else {
            return self.say(&format!("no row {number} on this page"));
        };
        let name = self
            .controller
            .state()
            .find(&id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let answer = self
            .ask(&format!("Delete \"{name}\"? [y/N]: "))
            .await?
            .unwrap_or_default();
        let confirmed = is_yes(&answer);

        let pb = self.spinner("deleting product");
        let result = self.controller.delete(&id, |_| confirmed).await;
        pb.finish_and_clear();
        self.flush_notices()?;
        match result {
            Ok(Mutation::Declined) => self.say("kept"),
            Err(MutationError::UnknownProduct { id }) => {
                self.say(&format!("product {id} is gone, try refresh"))
            }
            _ => self.render(),
        }
    }
}
