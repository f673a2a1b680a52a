use clap::{Args, Parser, Subcommand};

use crate::data_models::DataType;
use crate::state::UiState;

const JSON_OUTPUT_FLAG: &str = "--json";

#[derive(Parser, Debug)]
#[command(name = "ghosteye", about = "Open source intelligence search over Gemini")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search; inline flags such as `-u` or `--email` select the data type.
    Search(SearchArgs),
    /// Show or change the persisted filter toggles.
    Filters {
        #[command(subcommand)]
        action: FiltersAction,
    },
    /// List the inline flag syntax.
    Flags,
    /// Serve the HTTP API.
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Print the extracted response as JSON.
    #[arg(long)]
    pub json: bool,
    /// Query words. Re-runs the stored query when empty.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub query: Vec<String>,
}

impl SearchArgs {
    /// Query text and output mode. Once the query starts every later word is
    /// captured as query text, so `--json` is pulled back out of it here.
    pub fn query_and_json(&self) -> (String, bool) {
        let mut json = self.json;
        let words: Vec<&str> = self
            .query
            .iter()
            .map(String::as_str)
            .filter(|word| {
                let is_flag = *word == JSON_OUTPUT_FLAG;
                json |= is_flag;
                !is_flag
            })
            .collect();
        (words.join(" "), json)
    }
}

#[derive(Subcommand, Debug)]
pub enum FiltersAction {
    Show,
    Reset,
    Set(FilterArgs),
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long = "type", value_enum)]
    pub data_type: Option<DataType>,
    #[arg(long)]
    pub exact_match: Option<bool>,
    #[arg(long)]
    pub include_socials: Option<bool>,
    #[arg(long)]
    pub deep_search: Option<bool>,
    #[arg(long)]
    pub cross_reference: Option<bool>,
}

impl FilterArgs {
    /// Applies only the options that were given.
    pub fn apply(&self, state: &mut UiState) {
        if let Some(t) = self.data_type {
            state.data_type = t;
        }
        let filters = &mut state.filters;
        if let Some(v) = self.exact_match {
            filters.exact_match = v;
        }
        if let Some(v) = self.include_socials {
            filters.include_socials = v;
        }
        if let Some(v) = self.deep_search {
            filters.deep_search = v;
        }
        if let Some(v) = self.cross_reference {
            filters.cross_reference = v;
        }
    }
}

impl FiltersAction {
    /// Returns whether the state changed and needs saving.
    pub fn apply(&self, state: &mut UiState) -> bool {
        match self {
            FiltersAction::Show => false,
            FiltersAction::Reset => {
                state.reset_filters();
                true
            }
            FiltersAction::Set(args) => {
                args.apply(state);
                true
            }
        }
    }
}
