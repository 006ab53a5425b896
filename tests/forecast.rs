//! End-to-end forecast building against mocked NWS and `OpenMeteo` servers.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde_json::{Value, json};
use snowcast::config::ForecastConfig;
use snowcast::pipeline::{ShortRenderer, UnitLocalize};
use snowcast::weather::{NwsSource, OpenMeteoSource};
use snowcast::{
    ForecastBuilder, ForecastProvider, ForecastRecord, Fetcher, Pipeline, Resort, RetryPolicy,
    SnowcastError,
};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FORECAST_PATH: &str = "/gridpoints/TEST/1,2/forecast";

fn period(name: &str, start: &str, short: &str, detailed: &str) -> Value {
    json!({
        "name": name,
        "startTime": start,
        "shortForecast": short,
        "detailedForecast": detailed,
    })
}

fn forecast_document(updated: &str, periods: Vec<Value>) -> Value {
    json!({
        "properties": {
            "updated": updated,
            "periods": periods,
        }
    })
}

async fn mount_forecast(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> ForecastProvider {
    let fetcher = Fetcher::new(reqwest::Client::new()).with_retry(RetryPolicy::immediate(2));
    ForecastProvider::new(fetcher, &ForecastConfig::default())
        .with_nws(NwsSource::default().with_base_url(server.uri()))
        .with_open_meteo(OpenMeteoSource::default().with_base_url(server.uri()))
}

fn builder(server: &MockServer) -> ForecastBuilder {
    ForecastBuilder::new(provider(server), 2)
}

fn resort(server: &MockServer) -> Resort {
    Resort::new("test", "Test Mountain", 1.001, 2.002)
        .with_forecast_url(format!("{}{FORECAST_PATH}", server.uri()))
}

async fn sentence_for(periods: Vec<Value>) -> String {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        forecast_document(&Utc::now().to_rfc3339(), periods),
    )
    .await;

    builder(&server)
        .build_forecast(&resort(&server), &Pipeline::sentence())
        .await
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_snow_on_both_periods_is_summed() {
    let sentence = sentence_for(vec![
        period("Today", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
        period("Tonight", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 4 to 9 inches of snow."),
    ])
    .await;

    assert_eq!(sentence, "4-13\" of snow 03/01");
}

#[tokio::test]
async fn test_light_snow_is_summed() {
    let sentence = sentence_for(vec![
        period("Today", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
        period("Tonight", "2022-03-01T18:00:00-08:00", "Light Snow", "We are expecting 1 to 2 inches of snow."),
    ])
    .await;

    assert_eq!(sentence, "2-6\" of snow 03/01");
}

#[tokio::test]
async fn test_sunny_half_day_keeps_the_snow() {
    let sentence = sentence_for(vec![
        period("Today", "2022-03-01T18:00:00-08:00", "Sunny", "It is way too sunny to ski."),
        period("Tonight", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
    ])
    .await;

    assert_eq!(sentence, "2-4\" of snow 03/01");
}

#[tokio::test]
async fn test_no_snow_either_period() {
    let sentence = sentence_for(vec![
        period("Today", "2022-03-01T18:00:00-08:00", "Sunny", "It is way too sunny to ski."),
        period("Tonight", "2022-03-01T18:00:00-08:00", "Sunny", "It is way too sunny to ski."),
    ])
    .await;

    assert_eq!(sentence, "no snow 03/01");
}

#[tokio::test]
async fn test_snow_later_in_the_week() {
    let sentence = sentence_for(vec![
        period("Today", "2022-03-01T18:00:00-08:00", "Sunny", "It is way too sunny to ski."),
        period("Tonight", "2022-03-01T18:00:00-08:00", "Sunny", "It is way too sunny to ski."),
        period("Thursday Night", "2022-03-02T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
    ])
    .await;

    assert_eq!(sentence, "no snow 03/01 and 2-4\" of snow 03/02");
}

#[tokio::test]
async fn test_less_than_an_inch() {
    let sentence = sentence_for(vec![
        period("Today", "2022-03-01T18:00:00-08:00", "Snow", "New snow accumulation of around one inch possible"),
        period("Tonight", "2022-03-01T18:00:00-08:00", "Snow", "New snow accumulation of less than half an inch possible"),
        period("Wednesday", "2022-03-02T18:00:00-08:00", "Snow", "New snow accumulation of less than one inch possible."),
        period("Thursday", "2022-03-03T18:00:00-08:00", "Snow", "Little or no snow accumulation expected."),
        period("Friday Night", "2022-03-04T18:00:00-08:00", "Sunny", "It is way too sunny to ski."),
    ])
    .await;

    assert_eq!(sentence, "0-2\" of snow 03/01 and <1\" of snow 03/02");
}

#[tokio::test]
async fn test_server_error_degrades_to_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let view = builder(&server)
        .build_forecast(&resort(&server), &Pipeline::sentence())
        .await
        .unwrap();

    assert_eq!(view.to_string(), "no snow Today");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_updated_degrades_to_placeholder() {
    let server = MockServer::start().await;
    mount_forecast(&server, json!({})).await;

    let view = builder(&server)
        .build_forecast(&resort(&server), &Pipeline::sentence())
        .await
        .unwrap();

    assert_eq!(view.to_string(), "no snow Today");
}

#[tokio::test]
async fn test_stale_forecast_yields_exactly_one_record() {
    let server = MockServer::start().await;
    let two_days_ago = (Utc::now() - ChronoDuration::hours(48)).to_rfc3339();
    mount_forecast(
        &server,
        forecast_document(
            &two_days_ago,
            vec![period("Today", "2022-03-01T06:00:00-08:00", "Snow", "2 to 4 inches")],
        ),
    )
    .await;

    let records = provider(&server).records_for(&resort(&server)).await.unwrap();

    assert_eq!(records, vec![ForecastRecord::unavailable()]);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_parse_errors_are_not_degraded() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        json!({ "properties": { "updated": Utc::now().to_rfc3339() } }),
    )
    .await;

    let result = builder(&server)
        .build_forecast(&resort(&server), &Pipeline::sentence())
        .await;

    assert!(matches!(result, Err(SnowcastError::Parse { .. })));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_forecast_request_carries_feature_flags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .and(header_exists("Feature-Flags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_document(
            &Utc::now().to_rfc3339(),
            vec![period("Today", "2022-03-01T06:00:00-08:00", "Sunny", "Clear.")],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let view = builder(&server)
        .build_forecast(&resort(&server), &Pipeline::sentence())
        .await
        .unwrap();

    assert_eq!(view.to_string(), "no snow 03/01");
}

#[tokio::test]
async fn test_short_rows_per_period() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        forecast_document(
            &Utc::now().to_rfc3339(),
            vec![
                period("Today", "2022-03-01T18:00:00-08:00", "Snow", "It is way too sunny to ski."),
                period("This Afternoon", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
                period("Wednesday", "2022-03-02T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
                period("Saturday Night", "2022-03-05T18:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
            ],
        ),
    )
    .await;

    let pipeline = Pipeline::new(ShortRenderer::new(NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()))
        .stage(UnitLocalize);
    let view = builder(&server)
        .build_forecast(&resort(&server), &pipeline)
        .await
        .unwrap();

    let rows: Vec<(&str, &str, &str)> = view
        .rows()
        .iter()
        .map(|row| (row.name.as_str(), row.time_of_day.as_str(), row.snow.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Today", "Today", "0\""),
            ("This Afternoon", "Today", "2-4\""),
            ("Wednesday", "Tomorrow", "2-4\""),
            ("Saturday Night", "Sat", "2-4\""),
        ]
    );
}

#[tokio::test]
async fn test_points_lookup_for_us_resorts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/points/39.6000,-105.9500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "forecast": format!("{}{FORECAST_PATH}", server.uri()) }
        })))
        .mount(&server)
        .await;
    mount_forecast(
        &server,
        forecast_document(
            &Utc::now().to_rfc3339(),
            vec![period("Tonight", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 4 to 9 inches of snow.")],
        ),
    )
    .await;

    let resort = Resort::new("keystone", "Keystone", 39.6, -105.95).with_country("US");
    let view = builder(&server)
        .build_forecast(&resort, &Pipeline::sentence())
        .await
        .unwrap();

    assert_eq!(view.to_string(), "4-9\" of snow 03/01");
}

#[tokio::test]
async fn test_open_meteo_is_localized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily_units": {
                "temperature_2m_max": "°C",
                "windspeed_10m_max": "km/h",
                "snowfall_sum": "cm"
            },
            "daily": {
                "time": ["2024-01-15", "2024-01-16"],
                "weathercode": [75, 0],
                "temperature_2m_max": [-5.0, 0.0],
                "temperature_2m_min": [-12.0, -8.0],
                "snowfall_sum": [12.7, 0.0],
                "windspeed_10m_max": [20.0, 10.0],
                "windgusts_10m_max": [45.0, 20.0],
                "winddirection_10m_dominant": [300.0, 90.0]
            }
        })))
        .mount(&server)
        .await;

    let resort = Resort::new("stanton", "St. Anton", 47.13, 10.27).with_country("AT");
    let view = builder(&server)
        .build_forecast(&resort, &Pipeline::emoji())
        .await
        .unwrap();

    let snow: Vec<&str> = view.rows().iter().map(|row| row.snow.as_str()).collect();
    assert_eq!(snow, vec!["<5\"", "🚫"]);
    assert_eq!(view.rows()[0].short, "Heavy snow fall");
}

#[tokio::test]
async fn test_records_are_memoized_per_builder() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        forecast_document(
            &Utc::now().to_rfc3339(),
            vec![period("Today", "2022-03-01T06:00:00-08:00", "Snow", "2 to 4 inches")],
        ),
    )
    .await;
    let builder = builder(&server);
    let resort = resort(&server);

    let sentence = builder.build_forecast(&resort, &Pipeline::sentence()).await.unwrap();
    let emoji = builder.build_forecast(&resort, &Pipeline::emoji()).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(sentence.to_string(), "2-4\" of snow 03/01");
    assert_eq!(emoji.rows()[0].snow, "2-4\"");

    assert!(builder.forget(&resort.id).await);
    builder.build_forecast(&resort, &Pipeline::sentence()).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_today_view_combines_first_pair() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        forecast_document(
            &Utc::now().to_rfc3339(),
            vec![
                period("Today", "2022-03-01T06:00:00-08:00", "Snow", "We are expecting 2 to 4 inches of snow."),
                period("Tonight", "2022-03-01T18:00:00-08:00", "Snow", "We are expecting 4 to 9 inches of snow."),
                period("Wednesday", "2022-03-02T06:00:00-08:00", "Sunny", "It is way too sunny to ski."),
                period("Wednesday Night", "2022-03-02T18:00:00-08:00", "Snow", "We are expecting 1 to 2 inches of snow."),
                period("Thursday", "2022-03-03T06:00:00-08:00", "Snow", "We are expecting 3 to 5 inches of snow."),
            ],
        ),
    )
    .await;

    let view = builder(&server)
        .build_forecast(&resort(&server), &Pipeline::today())
        .await
        .unwrap();

    assert_eq!(view.to_string(), "4-13\" of snow 03/01 and 1-2\" of snow 03/02");
}

#[tokio::test]
async fn test_concurrent_builds_share_one_fetch() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        forecast_document(
            &Utc::now().to_rfc3339(),
            vec![period("Today", "2022-03-01T06:00:00-08:00", "Snow", "2 to 4 inches")],
        ),
    )
    .await;
    let builder = builder(&server);
    let resort = resort(&server);

    let sentence = Pipeline::sentence();
    let emoji = Pipeline::emoji();
    let (first, second) = tokio::join!(
        builder.build_forecast(&resort, &sentence),
        builder.build_forecast(&resort, &emoji),
    );

    assert_eq!(first.unwrap().to_string(), "2-4\" of snow 03/01");
    assert_eq!(second.unwrap().rows()[0].snow, "2-4\"");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_build_all_reports_each_resort() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        forecast_document(
            &Utc::now().to_rfc3339(),
            vec![period("Today", "2022-03-01T06:00:00-08:00", "Sunny", "Clear.")],
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let resorts = vec![
        resort(&server),
        Resort::new("broken", "Broken", 0.0, 0.0)
            .with_forecast_url(format!("{}/broken/forecast", server.uri())),
        Resort::new("other", "Other", 0.0, 0.0)
            .with_forecast_url(format!("{}{FORECAST_PATH}", server.uri())),
    ];

    let results = builder(&server)
        .build_all(&resorts, &Pipeline::sentence())
        .await;

    let ids: Vec<&str> = results.iter().map(|r| r.resort_id.as_str()).collect();
    assert_eq!(ids, vec!["test", "broken", "other"]);
    assert_eq!(
        results[0].result.as_ref().unwrap().to_string(),
        "no snow 03/01"
    );
    assert!(matches!(results[1].result, Err(SnowcastError::Parse { .. })));
    assert!(results[2].result.is_ok());
}
