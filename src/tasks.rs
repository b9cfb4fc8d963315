use std::fmt;

/// Default dataset kinds fetched when none are given on the command line.
pub const DEFAULT_SERVICES: [ServiceKind; 2] = [ServiceKind::Yellow, ServiceKind::Green];
/// Default years fetched when none are given on the command line.
pub const DEFAULT_YEARS: [&str; 2] = ["2019", "2020"];

/// Kind of trip data published by the release host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ServiceKind {
    Yellow,
    Green,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Yellow => "yellow",
            ServiceKind::Green => "green",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monthly file to move from the release host into the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub kind: ServiceKind,
    pub year: String,
    pub month: String,
}

impl Task {
    pub fn new(kind: ServiceKind, year: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            kind,
            year: year.into(),
            month: month.into(),
        }
    }

    /// File name shared by the source asset, the scratch file and the blob.
    pub fn file_name(&self) -> String {
        format!("{}_tripdata_{}-{}.csv.gz", self.kind, self.year, self.month)
    }

    /// Path of the asset relative to the release host base URL.
    pub fn source_path(&self) -> String {
        format!("download/{}/{}", self.kind, self.file_name())
    }

    pub fn source_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.source_path())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.kind, self.year, self.month)
    }
}

/// Static description of the cross-product to fetch.
#[derive(Debug, Clone)]
pub struct TaskSet {
    pub services: Vec<ServiceKind>,
    pub years: Vec<String>,
    pub months: Vec<String>,
}

impl Default for TaskSet {
    fn default() -> Self {
        Self {
            services: DEFAULT_SERVICES.to_vec(),
            years: DEFAULT_YEARS.iter().map(|y| y.to_string()).collect(),
            months: all_months(),
        }
    }
}

/// "01" through "12".
pub fn all_months() -> Vec<String> {
    (1..=12).map(|m| format!("{:02}", m)).collect()
}

/// Accepts exactly four ASCII digits.
pub fn parse_year(value: &str) -> Result<String, String> {
    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(value.to_string())
    } else {
        Err(format!("'{}' is not a four digit year", value))
    }
}

/// Accepts 1..=12 with or without a leading zero, returns the two digit form.
pub fn parse_month(value: &str) -> Result<String, String> {
    match value.parse::<u8>() {
        Ok(month @ 1..=12) => Ok(format!("{:02}", month)),
        _ => Err(format!("'{}' is not a month between 01 and 12", value)),
    }
}

impl TaskSet {
    /// return every (service, year, month) task, services outermost and months innermost
    pub fn generate(&self) -> Vec<Task> {
        let mut tasks =
            Vec::with_capacity(self.services.len() * self.years.len() * self.months.len());

        for service in &self.services {
            for year in &self.years {
                for month in &self.months {
                    tasks.push(Task::new(*service, year.clone(), month.clone()));
                }
            }
        }

        tasks
    }
}
