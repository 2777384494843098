use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, UtcOffset};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::api::{ApiError, EntryStore, HttpEntryStore};
use crate::calendar::{shift_month, MonthGrid};
use crate::canvas::{ImageId, PendingImage, PointerEvent, PointerOutcome, Rect};
use crate::config::fonts::FontRegistry;
use crate::config::{AppConfig, ConfigPaths};
use crate::entry::{EntryId, EntryView};
use crate::journaling::{ComposeError, Composer};
use crate::notify::{self, ToastKind, ToastQueue};
use crate::session::{SessionContext, TokenStore};
use crate::wire;

const PREVIEW_COLUMNS: usize = 60;

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Bearer token issued by the sign-in provider
    #[arg(long)]
    pub token: String,
}

#[derive(Args, Debug, Clone)]
pub struct EntryRefArgs {
    /// Entry identifier as shown by `list`
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct PostArgs {
    /// Entry title (required, whitespace trimmed)
    #[arg(long)]
    pub title: String,
    /// Entry body. If omitted, reads from stdin.
    #[arg(long)]
    pub text: Option<String>,
    /// Image to place on the canvas: PATH[@X,Y[,WxH]] (repeatable)
    #[arg(long = "image")]
    pub images: Vec<ImageSpec>,
    #[arg(long)]
    pub font_family: Option<String>,
    /// Font size in pixels, e.g. 18 or 18px
    #[arg(long)]
    pub font_size: Option<String>,
    #[arg(long)]
    pub italic: bool,
    #[arg(long)]
    pub bold: bool,
    /// Text color as #rrggbb
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CalendarArgs {
    /// Month to display as YYYY-MM (defaults to the current month)
    #[arg(long)]
    pub month: Option<String>,
    /// Highlight a day as YYYY-MM-DD and list its entries
    #[arg(long)]
    pub select: Option<String>,
    /// Move the displayed month by N months (negative for earlier ones)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub shift: i32,
}

/// `PATH[@X,Y[,WxH]]`: an image file plus optional target position and size.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    pub path: PathBuf,
    pub position: Option<(f64, f64)>,
    pub size: Option<(f64, f64)>,
}

impl FromStr for ImageSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        // a suffix without a comma belongs to the file name, as in `icon@2x.png`
        let Some((path, layout)) = raw.rsplit_once('@').filter(|(_, layout)| layout.contains(','))
        else {
            return Ok(Self {
                path: PathBuf::from(raw),
                position: None,
                size: None,
            });
        };
        if path.is_empty() {
            return Err(format!("missing image path in '{raw}'"));
        }
        let parts: Vec<&str> = layout.split(',').map(str::trim).collect();
        let (x, y, size) = match parts.as_slice() {
            [x, y] => (x, y, None),
            [x, y, size] => (x, y, Some(*size)),
            _ => return Err(format!("expected X,Y or X,Y,WxH after '@' in '{raw}'")),
        };
        let coord = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| format!("invalid coordinate '{value}' in '{raw}'"))
        };
        let size = size
            .map(|size| {
                let (w, h) = size
                    .split_once(|c: char| c.eq_ignore_ascii_case(&'x'))
                    .ok_or_else(|| format!("expected WxH, got '{size}'"))?;
                Ok::<_, String>((coord(w)?, coord(h)?))
            })
            .transpose()?;
        Ok(Self {
            path: PathBuf::from(path),
            position: Some((coord(x)?, coord(y)?)),
            size,
        })
    }
}

/// Everything a command needs: loaded config plus resolved paths.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    pub paths: ConfigPaths,
}

impl CommandContext {
    pub fn new(config: AppConfig, paths: ConfigPaths) -> Self {
        Self { config, paths }
    }

    fn token_store(&self) -> TokenStore {
        TokenStore::new(self.paths.token_file.clone())
    }

    fn session(&self) -> Result<SessionContext> {
        Ok(SessionContext::restore(self.token_store().load()?))
    }

    fn entry_store(&self) -> Result<HttpEntryStore> {
        HttpEntryStore::new(&self.config.api).context("building HTTP client")
    }

    fn toasts(&self) -> ToastQueue {
        ToastQueue::new(&self.config.notifications)
    }

    /// Drops the stored token when the server no longer accepts it.
    fn forget_rejected_session(&self, err: &ApiError) {
        if matches!(err, ApiError::Unauthorized) {
            if let Err(clear_err) = self.token_store().clear() {
                tracing::warn!(error = %clear_err, "could not clear rejected session");
            }
        }
    }
}

pub fn login(ctx: &CommandContext, args: LoginArgs) -> Result<()> {
    let mut session = ctx.session()?;
    let signed_in = session.login(args.token)?;
    ctx.token_store().save(signed_in)?;
    match signed_in.email() {
        Some(email) => println!("Signed in as {email}"),
        None => println!("Signed in"),
    }
    Ok(())
}

pub fn logout(ctx: &CommandContext) -> Result<()> {
    let store = ctx.token_store();
    let had_file = store.path().exists();
    let mut session = match store.load() {
        Ok(stored) => SessionContext::restore(stored),
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable session");
            SessionContext::new()
        }
    };
    let ended = session.logout();
    store.clear()?;
    if ended.is_none() && !had_file {
        println!("No session was stored.");
        return Ok(());
    }
    let mut toasts = ctx.toasts();
    toasts.push(ToastKind::Info, notify::SIGNED_OUT);
    print!("{}", render_toasts(&toasts));
    Ok(())
}

pub async fn list_entries(ctx: &CommandContext) -> Result<()> {
    let mut entries = fetch_entries(ctx).await?;
    sort_newest_first(&mut entries);
    print!("{}", format_entry_list(&entries, local_offset()));
    Ok(())
}

pub async fn show_entry(ctx: &CommandContext, args: EntryRefArgs) -> Result<()> {
    let id = EntryId::new(args.id);
    let entries = fetch_entries(ctx).await?;
    let Some(entry) = entries.iter().find(|entry| entry.id == id) else {
        bail!("entry {id} not found");
    };
    print!("{}", format_entry_detail(entry, local_offset()));
    Ok(())
}

pub async fn delete_entry(ctx: &CommandContext, args: EntryRefArgs) -> Result<()> {
    let session = ctx.session()?;
    let auth = session.require()?;
    let store = ctx.entry_store()?;
    let id = EntryId::new(args.id);
    if let Err(err) = store.delete_entry(auth, &id).await {
        ctx.forget_rejected_session(&err);
        return Err(err).with_context(|| format!("deleting entry {id}"));
    }
    println!("Deleted entry {id}");
    Ok(())
}

pub async fn post_entry(ctx: &CommandContext, args: PostArgs) -> Result<()> {
    let session = ctx.session()?;
    let auth = session.require()?;
    let store = ctx.entry_store()?;

    let text = match args.text.clone() {
        Some(text) => text,
        None => read_stdin()?.unwrap_or_default(),
    };
    let mut composer = build_composer(&ctx.config, &args, text)?;

    let mut toasts = ctx.toasts();
    let outcome = composer.submit(&store, auth).await;
    if let Err(ComposeError::Store(err)) = &outcome {
        ctx.forget_rejected_session(err);
    }
    report_submit(&mut toasts, &outcome);
    print!("{}", render_toasts(&toasts));

    match outcome? {
        Some(id) => println!("Created entry {id}"),
        None => println!("Created entry"),
    }
    Ok(())
}

pub async fn show_calendar(ctx: &CommandContext, args: CalendarArgs) -> Result<()> {
    let offset = local_offset();
    let today = OffsetDateTime::now_utc().to_offset(offset).date();
    let selected = args.select.as_deref().map(parse_day).transpose()?;
    let (year, month) = displayed_month(&args, selected, today)?;

    let entries = fetch_entries(ctx).await?;
    let grid = MonthGrid::build(year, month, &entries, today, selected, offset)
        .context("building calendar grid")?;
    print!("{}", render_month(&grid));

    if let Some(day) = selected.filter(|day| day.year() == year && day.month() == month) {
        println!();
        match grid.entry_for_click(day.day()) {
            Some(index) => print!("{}", format_entry_detail(&entries[index], offset)),
            None => {
                let on_day: Vec<EntryView> = grid
                    .day(day.day())
                    .map(|cell| cell.entries.iter().map(|&i| entries[i].clone()).collect())
                    .unwrap_or_default();
                print!("{}", format_entry_list(&on_day, offset));
            }
        }
    }
    Ok(())
}

fn displayed_month(args: &CalendarArgs, selected: Option<Date>, today: Date) -> Result<(i32, Month)> {
    let (year, month) = match (&args.month, selected) {
        (Some(raw), _) => parse_month(raw)?,
        (None, Some(day)) => (day.year(), day.month()),
        (None, None) => (today.year(), today.month()),
    };
    Ok(shift_month(year, month, args.shift))
}

async fn fetch_entries(ctx: &CommandContext) -> Result<Vec<EntryView>> {
    let session = ctx.session()?;
    let auth = session.require()?;
    let store = ctx.entry_store()?;
    match store.list_entries(auth).await {
        Ok(stored) => Ok(wire::decode_all(stored, store.base_url())),
        Err(err) => {
            ctx.forget_rejected_session(&err);
            Err(err).context("listing entries")
        }
    }
}

fn report_submit(toasts: &mut ToastQueue, outcome: &Result<Option<EntryId>, ComposeError>) {
    match outcome {
        Ok(_) => toasts.push(ToastKind::Success, notify::ENTRY_SHARED),
        Err(ComposeError::Store(_)) => toasts.push(ToastKind::Error, notify::ENTRY_FAILED),
        Err(err) => toasts.push(ToastKind::Error, err.to_string()),
    };
}

pub fn list_fonts() -> Result<()> {
    print!("{}", format_fonts(&FontRegistry::default()));
    Ok(())
}

fn format_fonts(registry: &FontRegistry) -> String {
    let mut out = String::from("families\n");
    for family in registry.families() {
        let _ = writeln!(&mut out, "  {family}");
    }
    let sizes: Vec<String> = registry
        .preset_sizes()
        .iter()
        .map(|size| format!("{size}px"))
        .collect();
    let _ = writeln!(&mut out, "sizes\n  {}", sizes.join(" "));
    out
}

fn build_composer(config: &AppConfig, args: &PostArgs, text: String) -> Result<Composer> {
    let mut composer = Composer::new(config);
    composer.set_title(args.title.clone());
    composer.set_text(text);

    let style = composer.style_mut();
    if let Some(family) = &args.font_family {
        style.set_font_family(family)?;
    }
    if let Some(size) = &args.font_size {
        style.set_font_size(size)?;
    }
    if args.italic {
        style.set_font_style("italic")?;
    }
    if args.bold {
        style.set_font_weight("bold")?;
    }
    if let Some(color) = &args.color {
        style.set_color(color)?;
    }

    for spec in &args.images {
        let image = load_image(spec)?;
        let id = composer.add_image(image);
        place_image(&mut composer, id, spec, config.canvas.handle_size)?;
    }
    Ok(composer)
}

fn load_image(spec: &ImageSpec) -> Result<PendingImage> {
    let mime = mime_guess::from_path(&spec.path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        bail!("{} is not an image ({mime})", spec.path.display());
    }
    let bytes =
        fs::read(&spec.path).with_context(|| format!("reading image {}", spec.path.display()))?;
    let file_name = spec
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(PendingImage::new(file_name, mime.essence_str(), bytes))
}

/// Moves and resizes a freshly added image by replaying the pointer
/// gestures a user would perform on it.
fn place_image(
    composer: &mut Composer,
    id: ImageId,
    spec: &ImageSpec,
    handle_size: f64,
) -> Result<()> {
    if let Some((x, y)) = spec.position {
        let rect = current_rect(composer, id)?;
        let (grab_x, grab_y) = (rect.width / 2.0, rect.height / 2.0);
        expect_outcome(
            composer.pointer(PointerEvent::Down {
                x: rect.x + grab_x,
                y: rect.y + grab_y,
            }),
            PointerOutcome::DragStarted(id),
        )?;
        composer.pointer(PointerEvent::Move {
            x: x + grab_x,
            y: y + grab_y,
        });
        composer.pointer(PointerEvent::Up);
    }
    if let Some((width, height)) = spec.size {
        let rect = current_rect(composer, id)?;
        let half = handle_size / 2.0;
        expect_outcome(
            composer.pointer(PointerEvent::Down {
                x: rect.right() - half,
                y: rect.bottom() - half,
            }),
            PointerOutcome::ResizeStarted(id),
        )?;
        composer.pointer(PointerEvent::Move {
            x: rect.x + width,
            y: rect.y + height,
        });
        composer.pointer(PointerEvent::Up);
    }
    Ok(())
}

fn current_rect(composer: &Composer, id: ImageId) -> Result<Rect> {
    composer
        .draft()
        .canvas
        .get(id)
        .map(|image| image.rect)
        .with_context(|| format!("image {id} vanished from the canvas"))
}

fn expect_outcome(actual: PointerOutcome, expected: PointerOutcome) -> Result<()> {
    if actual != expected {
        bail!("could not start gesture: expected {expected:?}, got {actual:?}");
    }
    Ok(())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn parse_month(raw: &str) -> Result<(i32, Month)> {
    let (year, month) = raw
        .trim()
        .split_once('-')
        .with_context(|| format!("expected YYYY-MM, got '{raw}'"))?;
    let year: i32 = year.parse().with_context(|| format!("invalid year in '{raw}'"))?;
    let month: u8 = month.parse().with_context(|| format!("invalid month in '{raw}'"))?;
    let month = Month::try_from(month).with_context(|| format!("invalid month in '{raw}'"))?;
    Ok((year, month))
}

fn parse_day(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("expected YYYY-MM-DD, got '{raw}'"))
}

/// Undated entries go last, keeping server order among themselves.
fn sort_newest_first(entries: &mut [EntryView]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn format_created(entry: &EntryView, offset: UtcOffset) -> String {
    entry
        .created_at
        .and_then(|at| {
            at.to_offset(offset)
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| "unknown date".to_string())
}

fn format_entry_list(entries: &[EntryView], offset: UtcOffset) -> String {
    if entries.is_empty() {
        return "No entries yet.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(&mut out, "#{}  {}", entry.id, entry.title);
        let _ = writeln!(
            &mut out,
            "    {} by {}{}",
            format_created(entry, offset),
            entry.author,
            match entry.canvas.len() {
                0 => String::new(),
                1 => "  [1 image]".to_string(),
                n => format!("  [{n} images]"),
            }
        );
        let preview = build_preview(&entry.text, PREVIEW_COLUMNS);
        if !preview.is_empty() {
            let _ = writeln!(&mut out, "    {preview}");
        }
        out.push('\n');
    }
    out
}

fn format_entry_detail(entry: &EntryView, offset: UtcOffset) -> String {
    let style = &entry.style;
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", entry.title);
    let _ = writeln!(
        &mut out,
        "by {} on {}",
        entry.author,
        format_created(entry, offset)
    );
    let _ = writeln!(
        &mut out,
        "style   {} {} (title {}) {} {} {}",
        style.font_family,
        style.font_size,
        entry.title_font_size(),
        style.font_style,
        style.font_weight,
        style.color.as_str()
    );
    out.push('\n');
    for line in entry.text.lines() {
        let _ = writeln!(&mut out, "  {line}");
    }
    if !entry.canvas.is_empty() {
        out.push('\n');
        let _ = writeln!(&mut out, "images");
        for image in entry.canvas.images() {
            let rect = image.rect;
            let _ = writeln!(
                &mut out,
                "  {:>3}  at ({}, {})  {}x{}  {}",
                image.id,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                image.source.url().unwrap_or("<pending>")
            );
        }
    }
    out
}

/// First line of the body cut to `max_columns` display cells.
fn build_preview(body: &str, max_columns: usize) -> String {
    let mut lines = body.lines().map(str::trim).filter(|line| !line.is_empty());
    let Some(first) = lines.next() else {
        return String::new();
    };
    let mut preview = String::new();
    let mut width = 0usize;
    let mut truncated = lines.next().is_some();
    for grapheme in first.graphemes(true) {
        let glyph_width = UnicodeWidthStr::width(grapheme);
        if width + glyph_width > max_columns.saturating_sub(1) {
            truncated = true;
            break;
        }
        preview.push_str(grapheme);
        width += glyph_width;
    }
    if truncated {
        preview.push('…');
    }
    preview
}

fn render_month(grid: &MonthGrid) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{:^35}", grid.title());
    for weekday in ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"] {
        let _ = write!(&mut out, " {weekday}  ");
    }
    out.push('\n');
    for week in grid.weeks() {
        for slot in week {
            let Some(cell) = slot else {
                out.push_str("     ");
                continue;
            };
            let (open, close) = if cell.is_selected {
                ('[', ']')
            } else if cell.is_today {
                ('(', ')')
            } else {
                (' ', ' ')
            };
            let marker = if cell.entries.is_empty() { ' ' } else { '*' };
            let _ = write!(&mut out, "{open}{:>2}{close}{marker}", cell.date.day());
        }
        out.push('\n');
    }
    out
}

fn render_toasts(toasts: &ToastQueue) -> String {
    toasts
        .active()
        .iter()
        .map(|toast| format!("{} {}\n", toast.kind.icon(), toast.message))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasView;
    use crate::entry::{EntryStyle, ValidationError};
    use time::macros::datetime;

    type TestResult<T = ()> = Result<T>;

    fn view(id: &str, text: &str) -> EntryView {
        EntryView {
            id: EntryId::new(id),
            title: format!("Title {id}"),
            text: text.to_string(),
            author: "Anonymous".into(),
            created_at: Some(datetime!(2026-10-18 09:30 UTC)),
            style: EntryStyle::default(),
            canvas: CanvasView::default(),
        }
    }

    fn post_args(images: Vec<ImageSpec>) -> PostArgs {
        PostArgs {
            title: "A quiet day".into(),
            text: Some("Nothing much happened.".into()),
            images,
            font_family: Some("serif".into()),
            font_size: Some("20".into()),
            italic: true,
            bold: false,
            color: Some("#336699".into()),
        }
    }

    #[test]
    fn image_spec_parses_optional_layout() {
        let plain: ImageSpec = "photo.png".parse().unwrap();
        assert_eq!(plain.path, PathBuf::from("photo.png"));
        assert_eq!(plain.position, None);

        let placed: ImageSpec = "dir/photo.png@120,40".parse().unwrap();
        assert_eq!(placed.position, Some((120.0, 40.0)));
        assert_eq!(placed.size, None);

        let sized: ImageSpec = "photo.png@0,0,200x80".parse().unwrap();
        assert_eq!(sized.size, Some((200.0, 80.0)));

        let retina: ImageSpec = "icon@2x.png".parse().unwrap();
        assert_eq!(retina.path, PathBuf::from("icon@2x.png"));
        assert_eq!(retina.position, None);

        let retina_placed: ImageSpec = "icon@2x.png@10,20".parse().unwrap();
        assert_eq!(retina_placed.path, PathBuf::from("icon@2x.png"));
        assert_eq!(retina_placed.position, Some((10.0, 20.0)));

        assert!("photo.png@1,x".parse::<ImageSpec>().is_err());
        assert!("photo.png@1,2,3".parse::<ImageSpec>().is_err());
        assert!("@1,2".parse::<ImageSpec>().is_err());
    }

    #[test]
    fn composer_positions_images_through_gestures() -> TestResult {
        let temp = tempfile::TempDir::new()?;
        let first = temp.path().join("first.png");
        let second = temp.path().join("second.jpg");
        fs::write(&first, b"\x89PNG")?;
        fs::write(&second, b"\xff\xd8\xff")?;

        let args = post_args(vec![
            ImageSpec {
                path: first,
                position: Some((200.0, 10.0)),
                size: Some((80.0, 60.0)),
            },
            ImageSpec {
                path: second,
                position: None,
                size: None,
            },
        ]);
        let composer = build_composer(&AppConfig::default(), &args, args.text.clone().unwrap())?;
        let draft = composer.draft();
        let rects: Vec<Rect> = draft.canvas.images().map(|image| image.rect).collect();
        assert_eq!(rects[0], Rect::new(200.0, 10.0, 80.0, 60.0));
        assert_eq!(rects[1], Rect::new(50.0, 50.0, 150.0, 150.0));
        assert!(draft.canvas.interaction().is_idle());

        let mimes: Vec<&str> = draft
            .canvas
            .images()
            .filter_map(|image| image.source.pending())
            .map(|pending| pending.mime.as_str())
            .collect();
        assert_eq!(mimes, vec!["image/png", "image/jpeg"]);
        assert_eq!(draft.style.font_family, "serif");
        assert_eq!(draft.style.color.as_str(), "#336699");
        Ok(())
    }

    #[test]
    fn composer_rejects_non_images_and_unknown_fonts() -> TestResult {
        let temp = tempfile::TempDir::new()?;
        let notes = temp.path().join("notes.txt");
        fs::write(&notes, "hello")?;
        let args = post_args(vec![ImageSpec {
            path: notes,
            position: None,
            size: None,
        }]);
        assert!(build_composer(&AppConfig::default(), &args, String::new()).is_err());

        let mut args = post_args(Vec::new());
        args.font_family = Some("Comic Sans".into());
        assert!(build_composer(&AppConfig::default(), &args, String::new()).is_err());
        Ok(())
    }

    #[test]
    fn preview_respects_display_width() {
        assert_eq!(build_preview("", 10), "");
        assert_eq!(build_preview("short", 10), "short");
        assert_eq!(build_preview("first\nsecond", 10), "first…");
        assert_eq!(build_preview("今日はいい天気でした", 9), "今日はい…");
    }

    #[test]
    fn entry_list_shows_author_and_image_count() {
        let mut entry = view("7", "Line one\nLine two");
        entry.canvas = CanvasView::new(vec![crate::canvas::ImagePlacement {
            id: ImageId::from_index(0),
            source: crate::canvas::ImageSource::Remote("http://x/a.png".into()),
            rect: Rect::new(1.0, 2.0, 3.0, 4.0),
        }]);
        let out = format_entry_list(&[entry], UtcOffset::UTC);
        assert!(out.contains("#7  Title 7"));
        assert!(out.contains("2026-10-18 09:30 by Anonymous  [1 image]"));
        assert!(out.contains("Line one…"));
        assert_eq!(format_entry_list(&[], UtcOffset::UTC), "No entries yet.\n");
    }

    fn context(root: &std::path::Path) -> CommandContext {
        CommandContext::new(AppConfig::default(), ConfigPaths::rooted_at(root))
    }

    #[test]
    fn logout_clears_truncated_session_file() -> TestResult {
        let temp = tempfile::TempDir::new()?;
        let ctx = context(temp.path());
        ctx.paths.ensure_directories()?;
        fs::write(&ctx.paths.token_file, r#"{"token": "abc", "start"#)?;

        logout(&ctx)?;
        assert!(!ctx.paths.token_file.exists());
        logout(&ctx)?;
        Ok(())
    }

    #[test]
    fn logout_removes_saved_session() -> TestResult {
        let temp = tempfile::TempDir::new()?;
        let ctx = context(temp.path());
        login(&ctx, LoginArgs { token: "abc".into() })?;
        assert!(ctx.paths.token_file.exists());

        logout(&ctx)?;
        assert!(ctx.session()?.current().is_none());
        Ok(())
    }

    #[test]
    fn list_orders_newest_first() {
        let mut older = view("1", "");
        older.created_at = Some(datetime!(2026-10-01 08:00 UTC));
        let mut undated = view("2", "");
        undated.created_at = None;
        let newer = view("3", "");
        let mut entries = vec![older, undated, newer];
        sort_newest_first(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn validation_failures_are_reported_as_toasts() {
        let mut toasts = ToastQueue::default();
        report_submit(
            &mut toasts,
            &Err(ComposeError::Validation(ValidationError::MissingTitle)),
        );
        report_submit(&mut toasts, &Err(ComposeError::Store(ApiError::Server { status: 503 })));
        report_submit(&mut toasts, &Ok(None));

        let reported: Vec<(ToastKind, &str)> = toasts
            .active()
            .iter()
            .map(|toast| (toast.kind, toast.message.as_str()))
            .collect();
        assert_eq!(
            reported,
            vec![
                (ToastKind::Error, "a title is required"),
                (ToastKind::Error, notify::ENTRY_FAILED),
                (ToastKind::Success, notify::ENTRY_SHARED),
            ]
        );
    }

    #[test]
    fn calendar_shift_moves_across_years() -> TestResult {
        let today = time::macros::date!(2026 - 10 - 18);
        let args = |month: Option<&str>, shift: i32| CalendarArgs {
            month: month.map(str::to_string),
            select: None,
            shift,
        };
        assert_eq!(displayed_month(&args(None, 0), None, today)?, (2026, Month::October));
        assert_eq!(displayed_month(&args(None, 3), None, today)?, (2027, Month::January));
        assert_eq!(
            displayed_month(&args(Some("2026-02"), -2), None, today)?,
            (2025, Month::December)
        );
        Ok(())
    }

    #[test]
    fn font_listing_shows_families_and_sizes() {
        let out = format_fonts(&FontRegistry::default());
        assert!(out.contains("  Times New Roman\n"));
        assert!(out.contains("12px 14px 16px 18px 20px 24px 28px 32px"));
    }

    #[test]
    fn month_and_day_arguments_parse() -> TestResult {
        assert_eq!(parse_month("2026-10")?, (2026, Month::October));
        assert!(parse_month("2026-13").is_err());
        assert_eq!(parse_day("2026-10-18")?.day(), 18);
        assert!(parse_day("18/10/2026").is_err());
        Ok(())
    }

    #[test]
    fn calendar_marks_selection_and_entries() -> TestResult {
        let entries = vec![view("1", "")];
        let grid = MonthGrid::build(
            2026,
            Month::October,
            &entries,
            time::macros::date!(2026 - 10 - 01),
            Some(time::macros::date!(2026 - 10 - 18)),
            UtcOffset::UTC,
        )?;
        let rendered = render_month(&grid);
        assert!(rendered.contains("October 2026"));
        assert!(rendered.contains("[18]*"));
        assert!(rendered.contains("( 1) "));
        Ok(())
    }
}
