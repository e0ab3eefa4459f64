//! Prompt context assembly.
//!
//! Everything the model is told beyond the user's literal question is built
//! here: system facts (date, time, season, location), the weather block, the
//! search-results block, and the explicit "nothing found" note that keeps the
//! model from fabricating specifics.

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::search::SearchResult;
use crate::weather::{WeatherSnapshot, WeatherSource};

/// Meteorological season, derived from the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    #[must_use]
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Spring => "İlkbahar",
            Self::Summer => "Yaz",
            Self::Autumn => "Sonbahar",
            Self::Winter => "Kış",
        }
    }
}

const MONTHS: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

const WEEKDAYS: [&str; 7] = [
    "Pazartesi",
    "Salı",
    "Çarşamba",
    "Perşembe",
    "Cuma",
    "Cumartesi",
    "Pazar",
];

/// Localized long date, e.g. `4 Ağustos 2026 Salı`.
fn format_long_date(moment: NaiveDateTime) -> String {
    let month = MONTHS[moment.month0() as usize];
    let weekday = WEEKDAYS[moment.weekday().num_days_from_monday() as usize];
    format!("{} {month} {} {weekday}", moment.day(), moment.year())
}

const NO_INFORMATION_NOTE: &str =
    "Güncel bilgi bulunamadı. Elindeki genel bilgiyle cevap ver ve güncel veriye ulaşamadığını belirt.";

const USE_RESULTS_INSTRUCTION: &str =
    "Yukarıdaki arama sonuçlarındaki bilgileri kullanarak cevap ver; tahmin yürütme.";

/// Everything gathered for one request before the generation call.
///
/// Immutable once built; lives only for the request.
#[derive(Debug)]
pub struct PromptContext {
    pub generated_at_local: NaiveDateTime,
    pub season: Season,
    pub location_label: String,
    pub weather: Option<WeatherSnapshot>,
    pub search_results: Vec<SearchResult>,
    pub freeform_notes: Vec<String>,
    pub augmentation_attempted: bool,
}

impl PromptContext {
    #[must_use]
    pub fn new(generated_at_local: NaiveDateTime, location_label: impl Into<String>) -> Self {
        Self {
            generated_at_local,
            season: Season::from_month(generated_at_local.month()),
            location_label: location_label.into(),
            weather: None,
            search_results: Vec::new(),
            freeform_notes: Vec::new(),
            augmentation_attempted: false,
        }
    }

    /// Render the labeled context block prepended to the user prompt.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let moment = self.generated_at_local;

        let _ = writeln!(out, "Tarih: {}", format_long_date(moment));
        let _ = writeln!(out, "Saat: {:02}:{:02}", moment.hour(), moment.minute());
        let _ = writeln!(out, "Mevsim: {}", self.season.label());
        let _ = write!(out, "Konum: {}", self.location_label);

        if let Some(weather) = &self.weather {
            out.push_str("\n\n");
            render_weather(&mut out, weather);
        }

        if !self.search_results.is_empty() {
            out.push_str("\n\nARAŞTIRMA SONUÇLARI:\n");
            for result in &self.search_results {
                let _ = writeln!(out, "- {}: {}", result.title, result.snippet);
            }
            out.push_str(USE_RESULTS_INSTRUCTION);
        }

        if self.augmentation_attempted && self.weather.is_none() && self.search_results.is_empty()
        {
            out.push_str("\n\n");
            out.push_str(NO_INFORMATION_NOTE);
        }

        for note in &self.freeform_notes {
            out.push_str("\n\n");
            out.push_str(note);
        }

        out
    }
}

fn render_weather(out: &mut String, weather: &WeatherSnapshot) {
    match weather.source {
        WeatherSource::PrimaryProvider => {
            let place = if weather.country.is_empty() {
                weather.city.clone()
            } else {
                format!("{}, {}", weather.city, weather.country)
            };
            let _ = writeln!(out, "HAVA DURUMU ({place}):");
            let _ = writeln!(out, "Sıcaklık: {}°C", weather.temperature_c);
            let _ = writeln!(out, "Hissedilen: {}°C", weather.feels_like_c);
            let _ = writeln!(out, "Nem: %{}", weather.humidity_pct);
            let _ = writeln!(out, "Durum: {}", weather.description);
            let _ = writeln!(out, "Rüzgar: {} km/h", weather.wind_kph);
            let _ = write!(out, "Basınç: {} hPa", weather.pressure_hpa);
        }
        WeatherSource::SearchFallback => {
            let _ = writeln!(out, "HAVA DURUMU (kaynak: web araması):");
            let _ = writeln!(out, "Sıcaklık: {}°C", weather.temperature_c);
            let _ = write!(out, "{}", weather.description);
        }
    }
}

const DEFAULT_PERSONA: &str = "Sen çok akıllı bir asistansın ve şirketin profesyonel müşteri temsilcisisin.\n\nKURALLAR:\n- ASLA \"bilmiyorum\" deme\n- Araştırma sonuçları varsa onları kullan\n- Kısa ama bilgilendirici yanıt ver\n- Müşteri odaklı düşün";

#[must_use]
pub fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

/// Wrap the rendered context and the literal user question in the assistant
/// persona preamble, producing the full text submitted to the model.
#[must_use]
pub fn assemble_prompt(persona: &str, context: &str, prompt: &str) -> String {
    format!("{persona}\n\n{context}\n\nSORU: \"{prompt}\"\n\nPROFESYONEL YANIT:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn moment(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    #[test]
    fn season_mapping_covers_all_twelve_months() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (4, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (7, Season::Summer),
            (8, Season::Summer),
            (9, Season::Autumn),
            (10, Season::Autumn),
            (11, Season::Autumn),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), season, "month {month}");
        }
    }

    #[test]
    fn renders_system_facts_with_localized_date() {
        let context = PromptContext::new(moment(2026, 8, 4), "Türkiye/Almanya");
        let rendered = context.render();
        assert!(rendered.contains("Tarih: 4 Ağustos 2026 Salı"), "{rendered}");
        assert!(rendered.contains("Saat: 14:05"));
        assert!(rendered.contains("Mevsim: Yaz"));
        assert!(rendered.contains("Konum: Türkiye/Almanya"));
    }

    #[test]
    fn renders_every_weather_field() {
        let mut context = PromptContext::new(moment(2026, 8, 4), "Türkiye/Almanya");
        context.weather = Some(WeatherSnapshot {
            city: "Istanbul".to_string(),
            country: "TR".to_string(),
            temperature_c: 21,
            feels_like_c: 21,
            humidity_pct: 55,
            description: "açık".to_string(),
            wind_kph: 12,
            pressure_hpa: 1013,
            source: WeatherSource::PrimaryProvider,
        });
        context.augmentation_attempted = true;

        let rendered = context.render();
        assert!(rendered.contains("HAVA DURUMU (Istanbul, TR):"));
        assert!(rendered.contains("Sıcaklık: 21°C"));
        assert!(rendered.contains("Hissedilen: 21°C"));
        assert!(rendered.contains("Nem: %55"));
        assert!(rendered.contains("Durum: açık"));
        assert!(rendered.contains("Rüzgar: 12 km/h"));
        assert!(rendered.contains("Basınç: 1013 hPa"));
        assert!(!rendered.contains(NO_INFORMATION_NOTE));
    }

    #[test]
    fn renders_search_results_with_instruction() {
        let mut context = PromptContext::new(moment(2026, 8, 4), "Türkiye/Almanya");
        context.search_results = vec![SearchResult {
            title: "Acme GmbH".to_string(),
            snippet: "Erfurt merkezli yazılım firması".to_string(),
            link: None,
        }];
        context.augmentation_attempted = true;

        let rendered = context.render();
        assert!(rendered.contains("ARAŞTIRMA SONUÇLARI:"));
        assert!(rendered.contains("- Acme GmbH: Erfurt merkezli yazılım firması"));
        assert!(rendered.contains(USE_RESULTS_INSTRUCTION));
        assert!(!rendered.contains(NO_INFORMATION_NOTE));
    }

    #[test]
    fn empty_augmentation_always_leaves_a_note() {
        let mut context = PromptContext::new(moment(2026, 8, 4), "Türkiye/Almanya");
        context.augmentation_attempted = true;

        let rendered = context.render();
        assert!(rendered.contains(NO_INFORMATION_NOTE), "{rendered}");
    }

    #[test]
    fn freeform_notes_are_appended_verbatim() {
        let mut context = PromptContext::new(moment(2026, 8, 4), "Türkiye/Almanya");
        context.freeform_notes.push("Ofis bugün kapalı.".to_string());
        assert!(context.render().ends_with("Ofis bugün kapalı."));
    }

    #[test]
    fn no_note_when_augmentation_was_not_attempted() {
        let context = PromptContext::new(moment(2026, 8, 4), "Türkiye/Almanya");
        assert!(!context.render().contains(NO_INFORMATION_NOTE));
    }

    #[test]
    fn assembled_prompt_keeps_the_literal_question() {
        let full = assemble_prompt("PERSONA", "CONTEXT", "Kimdir Atatürk?");
        assert!(full.starts_with("PERSONA"));
        assert!(full.contains("CONTEXT"));
        assert!(full.contains("SORU: \"Kimdir Atatürk?\""));
        assert!(full.ends_with("PROFESYONEL YANIT:"));
    }
}
