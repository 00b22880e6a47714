use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use tracing::debug;

#[derive(Debug)]
pub struct Keys {
    pattern: String,
    valid: bool,
}

impl Keys {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Keys> {
        let pattern = parse.next_string()?;
        Ok(Keys {
            pattern,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.keys(index, &self.pattern)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Keys {
    fn new_invalid() -> Keys {
        Keys {
            pattern: "".to_owned(),
            valid: false,
        }
    }
}
