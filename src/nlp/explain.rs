//! Spanish narrative returned alongside query API results.

use chrono::Datelike;

use super::query::QueryParams;

pub const DISCLAIMER: &str = "Este análisis utiliza datos históricos de precios y volumen de Solana (SOL) y es \
    puramente educativo. No constituye asesoramiento financiero ni una recomendación para invertir. \
    Los mercados criptográficos son volátiles y los resultados pasados no garantizan resultados futuros.";

/// Build the explanation for `query` given its parameters and optional prediction
pub fn generate_explanation(query: &str, prediction: Option<f64>, params: &QueryParams) -> String {
    let mut explanation = format!("Analicé tu consulta sobre Solana: '{}'. ", query);

    let start_year = params.time_range.start.year();
    let end_year = params.time_range.end.year();
    let time_info = if start_year == end_year {
        format!("para el año {}", start_year)
    } else {
        format!("desde {} hasta {}", start_year, end_year)
    };

    let indicators_info = if params.indicators.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = params.indicators.iter().map(|i| i.as_str()).collect();
        format!(" con los indicadores técnicos: {}", names.join(", "))
    };

    match prediction.filter(|p| *p != 0.0) {
        Some(p) => explanation.push_str(&format!(
            "Basado en el análisis {}{}, la predicción del precio es de {:.2} USD. ",
            time_info, indicators_info, p
        )),
        None => explanation.push_str(&format!("He preparado un análisis {}{}. ", time_info, indicators_info)),
    }

    explanation.push_str(DISCLAIMER);
    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::query::{extract_parameters, TimeRange};
    use chrono::NaiveDate;

    #[test]
    fn test_single_year_with_prediction() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let params = extract_parameters("predicción rsi 2023", today);
        let text = generate_explanation("predicción rsi 2023", Some(21.456), &params);
        assert!(text.starts_with("Analicé tu consulta sobre Solana: 'predicción rsi 2023'. "));
        assert!(text.contains("Basado en el análisis para el año 2023 con los indicadores técnicos: rsi"));
        assert!(text.contains("21.46 USD"));
        assert!(text.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_year_span_without_prediction() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut params = extract_parameters("precio", today);
        params.time_range = TimeRange::last_days(today, 30);
        let text = generate_explanation("precio", None, &params);
        assert!(text.contains("He preparado un análisis desde 2023 hasta 2024. "));
    }

    #[test]
    fn test_zero_prediction_is_ignored() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let params = extract_parameters("precio", today);
        let text = generate_explanation("precio", Some(0.0), &params);
        assert!(text.contains("He preparado un análisis para el año 2024. "));
    }
}
