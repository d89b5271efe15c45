pub(crate) mod color;
pub(crate) mod log;
pub(crate) mod results;

use self::results::ResultsFormatter;
use crate::options::OutputFormat;

/// Create a results formatter based on the given format option
pub(crate) fn get_results_formatter(format: OutputFormat) -> Box<dyn ResultsFormatter> {
    match format {
        OutputFormat::Plain => Box::new(results::Plain::new()),
        OutputFormat::Json => Box::new(results::Json::new()),
    }
}
