use crate::{
    error::{EmojiError, Result},
    host::{Bytes, FetchCallback, Fetcher},
};

/// Downloads images with [`ehttp`], on its background threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct EhttpFetcher;

fn get_image_bytes(url: &str, response: ehttp::Result<ehttp::Response>) -> Result<Bytes> {
    let fail = |message: String| EmojiError::Fetch {
        url: url.to_owned(),
        message,
    };

    let response = response.map_err(fail)?;
    if !response.ok {
        return Err(fail(match response.text() {
            Some(response_text) => format!(
                "{} {} {response_text}",
                response.status, response.status_text
            ),
            None => format!("{} {}", response.status, response.status_text),
        }));
    }

    let Some(content_type) = response.content_type() else {
        return Err(fail("no content-type header found".to_owned()));
    };
    if !content_type.starts_with("image/") && content_type != "application/octet-stream" {
        return Err(fail(format!(
            "expected content-type starting with \"image/\", found {content_type:?}"
        )));
    }

    Ok(response.bytes.into())
}

impl Fetcher for EhttpFetcher {
    fn fetch(&self, url: &str, on_done: FetchCallback) {
        log::trace!("started fetching {url:?}");
        let url = url.to_owned();
        ehttp::fetch(ehttp::Request::get(&url), move |response| {
            let result = get_image_bytes(&url, response);
            log::trace!("finished fetching {url:?}");
            on_done(result);
        });
    }
}
