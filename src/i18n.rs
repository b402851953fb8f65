use std::str::FromStr;

use serde::Deserialize;

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" => Ok(Locale::Ru),
            "en" => Ok(Locale::En),
            other => anyhow::bail!("unsupported locale: {other}"),
        }
    }
}

/// Message catalogue. Every string a client can see goes through here.
#[derive(Debug, Clone)]
pub struct Messages {
    pub user_exists: &'static str,
    pub invalid_credentials: &'static str,
    pub method_not_allowed: &'static str,
    pub enrolled: &'static str,
    pub internal: &'static str,
    pub invalid_json: &'static str,
    pub field_required: &'static str,
    pub email_too_short: &'static str,
    pub email_invalid: &'static str,
    pub password_too_short: &'static str,
    pub password_required: &'static str,
    pub full_name_required: &'static str,
    pub user_id_invalid: &'static str,
    pub course_id_invalid: &'static str,
}

const RU: Messages = Messages {
    user_exists: "Пользователь уже существует",
    invalid_credentials: "Неверный email или пароль",
    method_not_allowed: "Метод не поддерживается",
    enrolled: "Вы записаны на курс",
    internal: "Внутренняя ошибка сервера",
    invalid_json: "Некорректный JSON в теле запроса",
    field_required: "Обязательное поле",
    email_too_short: "Email должен содержать не менее 3 символов",
    email_invalid: "Invalid email format",
    password_too_short: "Пароль должен содержать не менее 6 символов",
    password_required: "Введите пароль",
    full_name_required: "Введите имя",
    user_id_invalid: "user_id должен быть целым числом",
    course_id_invalid: "course_id должен быть целым числом",
};

const EN: Messages = Messages {
    user_exists: "User already exists",
    invalid_credentials: "Invalid email or password",
    method_not_allowed: "Method not allowed",
    enrolled: "You are enrolled in the course",
    internal: "Internal server error",
    invalid_json: "Request body is not valid JSON",
    field_required: "Field required",
    email_too_short: "Email must be at least 3 characters",
    email_invalid: "Invalid email format",
    password_too_short: "Password must be at least 6 characters",
    password_required: "Password is required",
    full_name_required: "Full name is required",
    user_id_invalid: "user_id must be an integer",
    course_id_invalid: "course_id must be an integer",
};

impl Messages {
    pub fn for_locale(locale: Locale) -> &'static Messages {
        match locale {
            Locale::Ru => &RU,
            Locale::En => &EN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locale_case_insensitively() {
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!(" ru ".parse::<Locale>().unwrap(), Locale::Ru);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn russian_catalogue_matches_production_strings() {
        let m = Messages::for_locale(Locale::Ru);
        assert_eq!(m.invalid_credentials, "Неверный email или пароль");
        assert_eq!(m.user_exists, "Пользователь уже существует");
        assert_eq!(m.enrolled, "Вы записаны на курс");
    }
}
