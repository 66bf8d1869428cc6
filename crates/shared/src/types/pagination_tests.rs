use super::*;

#[test]
fn test_page_request_default() {
    let req = PageRequest::default();
    assert_eq!(req.page, 1);
    assert_eq!(req.per_page, 20);
    assert_eq!(req.offset(), 0);
    assert_eq!(req.limit(), 20);
}

#[test]
fn test_page_request_offset() {
    let req = PageRequest::new(3, 25);
    assert_eq!(req.offset(), 50);
    assert_eq!(req.limit(), 25);
}

#[test]
fn test_page_request_clamps() {
    let req = PageRequest::new(0, 10_000);
    assert_eq!(req.page, 1);
    assert_eq!(req.per_page, MAX_PER_PAGE);

    let req = PageRequest::new(2, 0);
    assert_eq!(req.per_page, 1);
}

#[test]
fn test_page_response_total_pages() {
    let resp = PageResponse::new(vec![1, 2, 3], PageRequest::new(1, 3), 10);
    assert_eq!(resp.meta.total_pages, 4);
    assert_eq!(resp.meta.total, 10);

    let resp = PageResponse::new(vec![1, 2], PageRequest::new(1, 2), 4);
    assert_eq!(resp.meta.total_pages, 2);
}

#[test]
fn test_page_response_empty() {
    let resp: PageResponse<u8> = PageResponse::new(vec![], PageRequest::default(), 0);
    assert_eq!(resp.meta.total_pages, 1);
    assert!(resp.data.is_empty());
}

#[test]
fn test_page_response_map() {
    let resp = PageResponse::new(vec![1, 2], PageRequest::new(1, 2), 2);
    let mapped = resp.map(|n| n * 10);
    assert_eq!(mapped.data, vec![10, 20]);
    assert_eq!(mapped.meta.total, 2);
}
