use std::io::Cursor;

use tracing::warn;
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::structs::Image as SheetImage;
use umya_spreadsheet::{
    Border, HorizontalAlignmentValues, Pane, PaneStateValues, PaneValues, SheetView,
    Spreadsheet, VerticalAlignmentValues, Worksheet,
};

use super::images::ResolvedImage;
use super::ReportError;
use crate::workflows::incentive::applications::domain::Application;

/// Written into the photo cell when no image could be embedded.
pub const PLACEHOLDER: &str = "-";

pub const PHOTO_SHEET: &str = "1";
pub const PAYOUT_SHEET: &str = "2";

const HEADER_FILL: &str = "FF4472C4";
const HEADER_FONT: &str = "FFFFFFFF";
const AMOUNT_FORMAT: &str = "#,##0";

/// Target image height in pixels; rows are sized from it.
const IMAGE_ROW_HEIGHT: f64 = 160.0;
const IMAGE_PADDING: f64 = 8.0;

const PHOTO_COLUMN: u32 = 5;
const AMOUNT_COLUMN: u32 = 4;

struct Column {
    letter: &'static str,
    title: &'static str,
    width: f64,
}

const PHOTO_COLUMNS: [Column; 5] = [
    Column { letter: "A", title: "Manager", width: 18.0 },
    Column { letter: "B", title: "Agency", width: 20.0 },
    Column { letter: "C", title: "Employee", width: 14.0 },
    Column { letter: "D", title: "Store", width: 25.0 },
    Column { letter: "E", title: "Product Display Photo", width: 30.0 },
];

const PAYOUT_COLUMNS: [Column; 6] = [
    Column { letter: "A", title: "Manager", width: 18.0 },
    Column { letter: "B", title: "Agency", width: 20.0 },
    Column { letter: "C", title: "Employee", width: 14.0 },
    Column { letter: "D", title: "Amount", width: 14.0 },
    Column { letter: "E", title: "Bank", width: 18.0 },
    Column { letter: "F", title: "Account Number", width: 22.0 },
];

/// In-memory workbook plus how many photos made it in.
pub struct BuiltWorkbook {
    pub book: Spreadsheet,
    pub embedded_images: usize,
}

/// Lays out both sheets. `images[i]` belongs to `rows[i]`.
pub fn build_workbook(
    rows: &[&Application],
    images: &[Option<ResolvedImage>],
) -> Result<BuiltWorkbook, ReportError> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();

    let embedded_images = {
        let sheet = book.new_sheet(PHOTO_SHEET).map_err(|reason| ReportError::Sheet {
            sheet: PHOTO_SHEET,
            reason: reason.to_string(),
        })?;
        write_photo_sheet(sheet, rows, images)
    };

    {
        let sheet = book.new_sheet(PAYOUT_SHEET).map_err(|reason| ReportError::Sheet {
            sheet: PAYOUT_SHEET,
            reason: reason.to_string(),
        })?;
        write_payout_sheet(sheet, rows);
    }

    Ok(BuiltWorkbook {
        book,
        embedded_images,
    })
}

/// Serializes the workbook to xlsx bytes.
pub fn render(book: &Spreadsheet) -> Result<Vec<u8>, ReportError> {
    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut out)
        .map_err(|err| ReportError::Write(err.to_string()))?;
    Ok(out.into_inner())
}

fn write_photo_sheet(
    sheet: &mut Worksheet,
    rows: &[&Application],
    images: &[Option<ResolvedImage>],
) -> usize {
    write_header(sheet, &PHOTO_COLUMNS);

    let mut embedded = 0;
    for (index, app) in rows.iter().enumerate() {
        let row = index as u32 + 2;
        set_text(sheet, 1, row, &app.manager_name);
        set_text(sheet, 2, row, &app.agency_name);
        set_text(sheet, 3, row, &app.employee_name);
        set_text(sheet, 4, row, &app.store_name);

        let dimension = sheet.get_row_dimension_mut(&row);
        dimension.set_height(IMAGE_ROW_HEIGHT / 0.75);
        dimension.set_custom_height(true);

        let placed = match images.get(index).and_then(Option::as_ref) {
            Some(image) => match embed_image(sheet, row, image) {
                Ok(()) => true,
                Err(reason) => {
                    warn!(application_id = %app.id, %reason, "product photo could not be embedded");
                    false
                }
            },
            None => false,
        };

        if placed {
            embedded += 1;
        } else {
            set_text(sheet, PHOTO_COLUMN, row, PLACEHOLDER);
        }
    }

    apply_grid(sheet, rows.len() as u32 + 1, PHOTO_COLUMNS.len() as u32);
    embedded
}

fn write_payout_sheet(sheet: &mut Worksheet, rows: &[&Application]) {
    write_header(sheet, &PAYOUT_COLUMNS);

    for (index, app) in rows.iter().enumerate() {
        let row = index as u32 + 2;
        set_text(sheet, 1, row, &app.manager_name);
        set_text(sheet, 2, row, &app.agency_name);
        set_text(sheet, 3, row, &app.employee_name);
        sheet
            .get_cell_mut((AMOUNT_COLUMN, row))
            .set_value_number(app.incentive_amount as f64);
        sheet
            .get_style_mut((AMOUNT_COLUMN, row))
            .get_number_format_mut()
            .set_format_code(AMOUNT_FORMAT);
        set_text(sheet, 5, row, &app.bank_name);
        set_text(sheet, 6, row, &app.account_number);
    }

    apply_grid(sheet, rows.len() as u32 + 1, PAYOUT_COLUMNS.len() as u32);
}

fn set_text(sheet: &mut Worksheet, col: u32, row: u32, value: &str) {
    sheet.get_cell_mut((col, row)).set_value_string(value);
}

fn write_header(sheet: &mut Worksheet, columns: &[Column]) {
    for (index, column) in columns.iter().enumerate() {
        let col = index as u32 + 1;
        set_text(sheet, col, 1, column.title);

        let style = sheet.get_style_mut((col, 1));
        let font = style.get_font_mut();
        font.set_bold(true);
        font.get_color_mut().set_argb(HEADER_FONT);
        style.set_background_color(HEADER_FILL);
        let alignment = style.get_alignment_mut();
        alignment.set_horizontal(HorizontalAlignmentValues::Center);
        alignment.set_vertical(VerticalAlignmentValues::Center);
        alignment.set_wrap_text(true);

        sheet
            .get_column_dimension_mut(column.letter)
            .set_width(column.width);
    }

    freeze_header_row(sheet);
}

/// Keeps row 1 visible while scrolling.
fn freeze_header_row(sheet: &mut Worksheet) {
    let mut pane = Pane::default();
    pane.set_vertical_split(1.0);
    pane.get_top_left_cell_mut().set_coordinate("A2");
    pane.set_active_pane(PaneValues::BottomLeft);
    pane.set_state(PaneStateValues::Frozen);

    let mut view = SheetView::default();
    view.set_tab_selected(sheet.get_sheet_id() == "1");
    view.set_pane(pane);
    sheet.get_sheet_views_mut().add_sheet_view_list_mut(view);
}

/// Thin borders on every populated cell; data rows are centred vertically and wrapped.
fn apply_grid(sheet: &mut Worksheet, last_row: u32, columns: u32) {
    for row in 1..=last_row {
        for col in 1..=columns {
            let style = sheet.get_style_mut((col, row));
            let borders = style.get_borders_mut();
            borders.get_top_mut().set_border_style(Border::BORDER_THIN);
            borders.get_left_mut().set_border_style(Border::BORDER_THIN);
            borders.get_bottom_mut().set_border_style(Border::BORDER_THIN);
            borders.get_right_mut().set_border_style(Border::BORDER_THIN);

            if row > 1 {
                let alignment = style.get_alignment_mut();
                alignment.set_vertical(VerticalAlignmentValues::Center);
                alignment.set_wrap_text(true);
            }
        }
    }
}

/// Pixel extent of an embedded photo: fixed height, width from the source aspect ratio.
pub fn scaled_extent(source_width: u32, source_height: u32) -> (u32, u32) {
    let height = IMAGE_ROW_HEIGHT - IMAGE_PADDING;
    let ratio = f64::from(source_width.max(1)) / f64::from(source_height.max(1));
    ((height * ratio).round().max(1.0) as u32, height as u32)
}

fn embed_image(sheet: &mut Worksheet, row: u32, image: &ResolvedImage) -> Result<(), String> {
    if image.bytes.is_empty() {
        return Err("empty image payload".to_string());
    }
    ::image::guess_format(&image.bytes).map_err(|err| err.to_string())?;

    let (width, height) = scaled_extent(image.width, image.height);
    let mut marker = MarkerType::default();
    marker.set_coordinate(format!("E{row}"));

    let mut picture = SheetImage::default();
    picture.new_image_with_dimensions(
        height,
        width,
        &format!("product_photo_{row}.{}", image.kind.extension()),
        image.bytes.clone(),
        marker,
    );
    sheet.add_image(picture);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::incentive::applications::domain::{ApplicantDetails, ApplicationId};
    use crate::workflows::incentive::export::images::ImageKind;
    use ::image::{DynamicImage, ImageFormat, RgbImage};
    use chrono::Utc;

    fn app(id: &str) -> Application {
        Application::new(
            ApplicationId(id.to_string()),
            ApplicantDetails {
                agency_name: format!("Agency {id}"),
                manager_name: format!("Manager {id}"),
                employee_name: format!("Employee {id}"),
                store_name: format!("Store {id}"),
                store_address: "1 Main St".to_string(),
                bank_name: "Hana".to_string(),
                account_number: "0012345".to_string(),
            },
            Utc::now(),
            7000,
        )
    }

    fn png(width: u32, height: u32) -> ResolvedImage {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("png encodes");
        ResolvedImage {
            bytes: buffer.into_inner(),
            kind: ImageKind::Png,
            width,
            height,
        }
    }

    fn read_back(built: &BuiltWorkbook) -> Spreadsheet {
        let bytes = render(&built.book).expect("workbook renders");
        umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
            .expect("workbook reads back")
    }

    #[test]
    fn scaled_extent_preserves_aspect_ratio() {
        assert_eq!(scaled_extent(400, 200), (304, 152));
        assert_eq!(scaled_extent(200, 150), (203, 152));
        assert_eq!(scaled_extent(0, 0), (152, 152));
    }

    #[test]
    fn header_row_is_frozen_on_both_sheets() {
        let built = build_workbook(&[], &[]).expect("workbook builds");

        for name in [PHOTO_SHEET, PAYOUT_SHEET] {
            let sheet = built.book.get_sheet_by_name(name).expect("sheet exists");
            let views = sheet.get_sheets_views().get_sheet_view_list();
            assert_eq!(views.len(), 1);
            let pane = views[0].get_pane().expect("pane set");
            assert!(matches!(pane.get_state(), PaneStateValues::Frozen));
            assert_eq!(*pane.get_vertical_split(), 1.0);
            assert_eq!(*pane.get_horizontal_split(), 0.0);
            assert_eq!(pane.get_top_left_cell().get_coordinate(), "A2");
        }
    }

    #[test]
    fn empty_input_yields_header_only_sheets() {
        let built = build_workbook(&[], &[]).expect("workbook builds");
        assert_eq!(built.embedded_images, 0);

        let book = read_back(&built);
        assert_eq!(book.get_sheet_count(), 2);
        let photos = book.get_sheet_by_name(PHOTO_SHEET).expect("photo sheet");
        assert_eq!(photos.get_value((1, 1)), "Manager");
        assert_eq!(photos.get_value((5, 1)), "Product Display Photo");
        assert_eq!(photos.get_value((1, 2)), "");
        let payouts = book.get_sheet_by_name(PAYOUT_SHEET).expect("payout sheet");
        assert_eq!(payouts.get_value((6, 1)), "Account Number");
        assert_eq!(payouts.get_value((1, 2)), "");
    }

    #[test]
    fn rows_follow_input_order_with_placeholders_for_missing_images() {
        let first = app("1");
        let second = app("2");
        let third = app("3");
        let corrupt = ResolvedImage {
            bytes: b"definitely not pixels".to_vec(),
            kind: ImageKind::Jpeg,
            width: 200,
            height: 150,
        };
        let images = vec![Some(png(20, 10)), None, Some(corrupt)];

        let built =
            build_workbook(&[&first, &second, &third], &images).expect("workbook builds");
        assert_eq!(built.embedded_images, 1);

        let book = read_back(&built);
        let photos = book.get_sheet_by_name(PHOTO_SHEET).expect("photo sheet");
        assert_eq!(photos.get_value((1, 2)), "Manager 1");
        assert_eq!(photos.get_value((4, 3)), "Store 2");
        assert_eq!(photos.get_value((5, 2)), "");
        assert_eq!(photos.get_value((5, 3)), PLACEHOLDER);
        assert_eq!(photos.get_value((5, 4)), PLACEHOLDER);

        let payouts = book.get_sheet_by_name(PAYOUT_SHEET).expect("payout sheet");
        assert_eq!(payouts.get_value((2, 4)), "Agency 3");
        assert_eq!(payouts.get_value((4, 2)), "7000");
        assert_eq!(payouts.get_value((6, 3)), "0012345");
    }
}
