//! Write protection command implementation

use romflash_core::flash::FlashContext;
use romflash_core::wp::{self, parse_wp_range, WpRequest, WpRequestError};
use std::error::Error;

/// Raw `wp` options as given on the command line
#[derive(Debug, Clone, Default)]
pub struct WpOptions<'a> {
    pub list: bool,
    pub status: bool,
    pub range: Option<&'a str>,
    pub region: Option<&'a str>,
    pub enable: bool,
    pub disable: bool,
}

/// Turn the options into a request
///
/// Runs before the programmer is opened so malformed arguments fail early.
pub fn build_request(opts: &WpOptions<'_>) -> Result<WpRequest, WpRequestError> {
    let range = opts.range.map(parse_wp_range).transpose()?;
    let request = WpRequest {
        list_ranges: opts.list,
        target: WpRequest::target_from(range, opts.region.map(str::to_string))?,
        enable: opts.enable,
        disable: opts.disable,
        print_status: opts.status,
    };
    request.validate()?;
    Ok(request)
}

/// Run a write protection request and print its report
pub fn run_wp(ctx: &mut FlashContext<'_>, request: &WpRequest) -> Result<(), Box<dyn Error>> {
    if request.is_empty() {
        return Err("No write protection operation given \
                    (--wp-status, --wp-list, --wp-range, --wp-region, --wp-enable or --wp-disable)"
            .into());
    }
    let report = wp::run(ctx, request)?;
    print!("{}", report);
    Ok(())
}
