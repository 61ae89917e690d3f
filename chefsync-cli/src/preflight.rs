//! Pre-sync sanity checks. Each finding asks the operator to confirm; none of
//! them is a hard failure.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use dialoguer::Confirm;

/// Everything the checks look at, gathered up front.
#[derive(Debug, Clone)]
pub struct Preflight {
    pub vendor_dir: PathBuf,
    pub standard_vendor_dir: PathBuf,
    pub standard_branch: String,
    pub branch: Option<String>,
    pub local_commit: Option<String>,
    pub origin_commit: Option<String>,
}

impl Preflight {
    /// Questions the operator must answer "yes" to, in order.
    pub fn questions(&self) -> Vec<String> {
        let mut questions = Vec::new();
        if self.vendor_dir != self.standard_vendor_dir {
            questions.push(format!(
                "vendor directory ({}) is different than standard one ({}), continue?",
                self.vendor_dir.display(),
                self.standard_vendor_dir.display()
            ));
        }

        let branch = self.branch.as_deref().unwrap_or("unknown");
        let on_standard = branch == self.standard_branch;
        if !on_standard {
            questions.push(format!(
                "You are deploying a non-{} branch ({branch}), continue?",
                self.standard_branch
            ));
        }

        match &self.origin_commit {
            None => questions.push(format!(
                "failed to determine the origin/{}. sync anyway?",
                self.standard_branch
            )),
            Some(origin) if on_standard && self.local_commit.as_ref() != Some(origin) => {
                questions.push(format!(
                    "local {} branch is different than origin, sync anyway?",
                    self.standard_branch
                ));
            }
            Some(_) => {}
        }
        questions
    }

    /// Ask every question; the first "no" aborts.
    pub fn confirm(&self, confirmer: &dyn Confirmer) -> Result<()> {
        for question in self.questions() {
            if !confirmer.confirm(&question)? {
                bail!("aborted: {question}");
            }
        }
        Ok(())
    }
}

pub trait Confirmer {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Interactive terminal prompt.
pub struct Prompt;

impl Confirmer for Prompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .context("confirmation needs a terminal; pass --yes to accept")
    }
}

/// `--yes`: accept everything, echoing what was accepted.
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        println!("{question} yes (--yes)");
        Ok(true)
    }
}
