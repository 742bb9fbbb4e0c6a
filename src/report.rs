use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io::{self, Write},
};

/// Result of a single diagnostic step.
#[derive(Clone, Debug, Default)]
pub struct Diagnostic {
    pub name: &'static str,
    pub success: bool,
    pub output: Vec<String>,
    pub error: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            success: true,
            ..Default::default()
        }
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.output.push(line.into());
        self
    }

    pub fn fail(&mut self, error: impl ToString) -> &mut Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }

    /// Fails with the error and every cause beneath it, joined by `: `.
    pub fn fail_error(&mut self, error: &dyn Error) -> &mut Self {
        let mut text = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.fail(text)
    }

    pub fn help(&mut self, help: impl Into<String>) -> &mut Self {
        self.help = Some(help.into());
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "=> {} ", self.name)?;
        if self.success {
            write!(f, "OK ✅")?;
        } else {
            write!(f, "FAILED ❌")?;
        }

        for line in &self.output {
            write!(f, "\n   {}", line)?;
        }
        if let Some(error) = &self.error {
            write!(f, "\n\n### Error\n{}", error)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n\n### Help\n{}", help)?;
        }
        Ok(())
    }
}

/// Prints diagnostics as they complete and remembers which ones failed.
pub struct Report<W: Write> {
    out: W,
    failed: Vec<&'static str>,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            failed: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) -> io::Result<()> {
        if !diagnostic.success {
            self.failed.push(diagnostic.name);
        }
        writeln!(self.out, "{}\n", diagnostic)
    }

    /// Names of the failed steps, in the order they ran.
    pub fn failed(&self) -> &[&'static str] {
        &self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
