use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub captcha_url: String,
    pub captcha_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(captcha_url: String) -> Self {
        Self {
            captcha_url,
            captcha_secret: SecretString::default(),
        }
    }

    pub fn set_captcha_secret(&mut self, secret: SecretString) {
        self.captcha_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let url = "https://www.google.com/recaptcha/api/siteverify".to_string();
        let args = GlobalArgs::new(url);
        assert_eq!(
            args.captcha_url,
            "https://www.google.com/recaptcha/api/siteverify"
        );
        assert_eq!(args.captcha_secret.expose_secret(), "");
    }
}
