//! Endpoint URLs of the private web API.

use url::Url;

use crate::error::Result;

/// `https://{team}.datadoghq.com/`
pub fn root_url(team: &str) -> Result<Url> {
    Ok(Url::parse(&format!("https://{}.datadoghq.com/", team))?)
}

pub fn login_url(root: &Url) -> Result<Url> {
    let mut url = root.join("/account/login")?;
    url.query_pairs_mut().append_pair("redirect", "f");
    Ok(url)
}

pub fn metric_list_url(root: &Url, window: u32) -> Result<Url> {
    let mut url = root.join("/metric/list")?;
    url.query_pairs_mut()
        .append_pair("window", &window.to_string());
    Ok(url)
}

pub fn hosts_and_tags_url(root: &Url, metric: &str, window: u32) -> Result<Url> {
    let mut url = root.join("/metric/hosts_and_tags")?;
    url.query_pairs_mut()
        .append_pair("metric", metric)
        .append_pair("window", &window.to_string());
    Ok(url)
}
